//! JSON form of a chunk
//!
//! The field names follow the LionWeb JSON serialization format.

use crate::error::{ChunkError, ChunkResult};
use crate::model::{SerializedChunk, SERIALIZATION_FORMAT_VERSION};

impl SerializedChunk {
    /// Decode a chunk from JSON text
    ///
    /// # Errors
    /// Returns [`ChunkError::Json`] when the text is not a chunk.
    pub fn from_json_str(json: &str) -> ChunkResult<Self> {
        let chunk: Self = serde_json::from_str(json)?;
        tracing::trace!(
            "Decoded chunk: {} nodes, {} languages",
            chunk.nodes.len(),
            chunk.languages.len()
        );
        Ok(chunk)
    }

    /// Decode a chunk from JSON bytes
    ///
    /// # Errors
    /// Returns [`ChunkError::Json`] when the bytes are not a chunk.
    pub fn from_json_slice(json: &[u8]) -> ChunkResult<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Encode as compact JSON
    ///
    /// # Errors
    /// Returns [`ChunkError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> ChunkResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode as indented JSON
    ///
    /// # Errors
    /// Returns [`ChunkError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> ChunkResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the declared format version
    ///
    /// When `strict` is false a mismatch is only logged.
    ///
    /// # Errors
    /// Returns [`ChunkError::UnsupportedFormatVersion`] on a mismatch in
    /// strict mode.
    pub fn check_format_version(&self, strict: bool) -> ChunkResult<()> {
        if self.serialization_format_version == SERIALIZATION_FORMAT_VERSION {
            return Ok(());
        }
        if strict {
            return Err(ChunkError::UnsupportedFormatVersion {
                found: self.serialization_format_version.clone(),
                supported: SERIALIZATION_FORMAT_VERSION,
            });
        }
        tracing::warn!(
            "Chunk declares serialization format version '{}', expected '{}'",
            self.serialization_format_version,
            SERIALIZATION_FORMAT_VERSION
        );
        Ok(())
    }
}
