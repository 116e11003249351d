//! Normalized identifiers
//!
//! Provides [`CompressedId`], the identity key used by the deserializer's
//! node table, and [`NodeId`], which optionally keeps the original text.

use crate::codec::{self, PackedBytes};
use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Codec-normalized identifier
///
/// Alphabet-compliant identifiers are stored packed; anything else is kept
/// verbatim under the `Raw` tag. The tag participates in equality and
/// hashing, and since the choice of form is a pure function of the text,
/// two identifiers are equal exactly when their texts are equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompressedId {
    /// 6-bit packed form
    Packed(PackedBytes),

    /// Verbatim fallback for identifiers the codec cannot pack
    Raw(Box<str>),
}

impl CompressedId {
    /// Normalize an identifier, packing it when possible
    #[must_use]
    pub fn compress(id: &str) -> Self {
        match codec::encode(id) {
            Some(bytes) => Self::Packed(bytes),
            None => Self::Raw(id.into()),
        }
    }

    /// Keep an identifier verbatim (codec disabled)
    #[inline]
    #[must_use]
    pub fn raw(id: &str) -> Self {
        Self::Raw(id.into())
    }

    /// Whether the packed form is in use
    #[inline]
    #[must_use]
    pub fn is_packed(&self) -> bool {
        matches!(self, Self::Packed(_))
    }

    /// Packed bytes, if any
    #[inline]
    #[must_use]
    pub fn packed_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Packed(bytes) => Some(bytes),
            Self::Raw(_) => None,
        }
    }

    /// Textual identifier (decoded when packed)
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Packed(bytes) => Cow::Owned(codec::decode(bytes)),
            Self::Raw(text) => Cow::Borrowed(text),
        }
    }
}

impl Debug for CompressedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packed(bytes) => write!(f, "Packed({})", hex::encode(bytes)),
            Self::Raw(text) => write!(f, "Raw({text:?})"),
        }
    }
}

impl Display for CompressedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// How identifiers are normalized for one deserialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMode {
    /// Use the codec; optionally keep the original text for diagnostics
    Compressed {
        /// Keep the textual identifier next to the packed form
        keep_original: bool,
    },

    /// Bypass the codec and compare raw strings
    Uncompressed,
}

impl IdMode {
    /// Normalize `id` under this mode
    #[must_use]
    pub fn node_id(self, id: &str) -> NodeId {
        match self {
            Self::Compressed { keep_original } => {
                let compressed = CompressedId::compress(id);
                let original = (keep_original && compressed.is_packed()).then(|| id.into());
                NodeId { compressed, original }
            }
            Self::Uncompressed => NodeId {
                compressed: CompressedId::raw(id),
                original: None,
            },
        }
    }
}

impl Default for IdMode {
    fn default() -> Self {
        Self::Compressed {
            keep_original: false,
        }
    }
}

/// Identifier of a deserialized node
///
/// Equality and hashing use the compressed form only; the original text is
/// a debugging aid.
#[derive(Clone)]
pub struct NodeId {
    compressed: CompressedId,
    original: Option<Box<str>>,
}

impl NodeId {
    /// Compressed identity key
    #[inline]
    #[must_use]
    pub fn compressed(&self) -> &CompressedId {
        &self.compressed
    }

    /// Original text, when it was kept
    #[inline]
    #[must_use]
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Textual identifier
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match &self.original {
            Some(text) => Cow::Borrowed(text),
            None => self.compressed.to_text(),
        }
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.compressed.hash(state);
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.as_text())
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<CompressedId> for NodeId {
    fn from(compressed: CompressedId) -> Self {
        Self {
            compressed,
            original: None,
        }
    }
}

// Identifiers travel as plain strings
impl serde::Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_text())
    }
}

impl<'de> serde::Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = <Cow<'de, str>>::deserialize(deserializer)?;
        Ok(IdMode::default().node_id(&text))
    }
}
