//! Deserializer configuration
//!
//! camelCase keys, loadable from YAML. Id handling is given either as an
//! option map or as flat flags:
//!
//! ```yaml
//! compressedIds:
//!   keepOriginal: false
//! maxDuplicateIdRetries: 8
//! strictFormatVersion: false
//! ```
//!
//! `uncompressedIds: true` turns the codec off and wins over `compressedIds`.
//! The flat form is `compressedIds: <bool>` plus `keepOriginal: <bool>`.

use lionweb_ids::IdMode;
use serde::{Deserialize, Serialize};

/// Default number of times a duplicate id may be renamed by the handler
pub const DEFAULT_MAX_DUPLICATE_ID_RETRIES: usize = 8;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Document is not valid YAML or has unknown keys
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Options of one deserialization run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ConfigDocument")]
pub struct DeserializerConfig {
    /// Pack ids with the 6-bit codec
    pub compressed_ids: bool,

    /// Keep the original id text next to packed ids
    pub keep_original: bool,

    /// Handler consultations allowed for one colliding record
    pub max_duplicate_id_retries: usize,

    /// Reject chunks in another serialization format version
    pub strict_format_version: bool,
}

impl DeserializerConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a YAML document
    ///
    /// # Errors
    /// Returns error on malformed YAML, unknown keys or out-of-range values
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_duplicate_id_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "maxDuplicateIdRetries",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// With id compression on or off
    #[inline]
    #[must_use]
    pub fn with_compressed_ids(mut self, enabled: bool) -> Self {
        self.compressed_ids = enabled;
        self
    }

    /// With original id text kept
    #[inline]
    #[must_use]
    pub fn with_keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }

    /// With duplicate id retry limit
    #[inline]
    #[must_use]
    pub fn with_max_duplicate_id_retries(mut self, retries: usize) -> Self {
        self.max_duplicate_id_retries = retries;
        self
    }

    /// With strict format version checking
    #[inline]
    #[must_use]
    pub fn with_strict_format_version(mut self, strict: bool) -> Self {
        self.strict_format_version = strict;
        self
    }

    /// Id normalization for this run
    #[must_use]
    pub fn id_mode(&self) -> IdMode {
        if self.compressed_ids {
            IdMode::Compressed {
                keep_original: self.keep_original,
            }
        } else {
            IdMode::Uncompressed
        }
    }
}

impl Default for DeserializerConfig {
    fn default() -> Self {
        Self {
            compressed_ids: true,
            keep_original: false,
            max_duplicate_id_retries: DEFAULT_MAX_DUPLICATE_ID_RETRIES,
            strict_format_version: false,
        }
    }
}

/// `compressedIds` as written: a flag or an option map
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompressedIdsEntry {
    Flag(bool),
    Options(CompressedIdsOptions),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct CompressedIdsOptions {
    keep_original: bool,
}

/// Configuration document before the id keys are folded together
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
struct ConfigDocument {
    compressed_ids: Option<CompressedIdsEntry>,
    uncompressed_ids: bool,
    keep_original: bool,
    max_duplicate_id_retries: usize,
    strict_format_version: bool,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            compressed_ids: None,
            uncompressed_ids: false,
            keep_original: false,
            max_duplicate_id_retries: DEFAULT_MAX_DUPLICATE_ID_RETRIES,
            strict_format_version: false,
        }
    }
}

impl From<ConfigDocument> for DeserializerConfig {
    fn from(doc: ConfigDocument) -> Self {
        let (compressed, nested_keep) = match doc.compressed_ids {
            None => (true, false),
            Some(CompressedIdsEntry::Flag(enabled)) => (enabled, false),
            Some(CompressedIdsEntry::Options(options)) => (true, options.keep_original),
        };
        Self {
            compressed_ids: compressed && !doc.uncompressed_ids,
            keep_original: nested_keep || doc.keep_original,
            max_duplicate_id_retries: doc.max_duplicate_id_retries,
            strict_format_version: doc.strict_format_version,
        }
    }
}
