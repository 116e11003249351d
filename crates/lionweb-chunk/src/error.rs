//! Error types for chunk decoding

/// Errors while reading or writing a chunk
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// Malformed JSON or wrong shape
    #[error("invalid chunk JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Format version this crate does not read
    #[error("unsupported serialization format version '{found}' (supported: {supported})")]
    UnsupportedFormatVersion {
        found: String,
        supported: &'static str,
    },
}

/// Result type alias for chunk operations
pub type ChunkResult<T> = Result<T, ChunkError>;
