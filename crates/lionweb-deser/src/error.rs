//! Deserialization errors

use crate::anomaly::Anomaly;
use crate::config::ConfigError;
use crate::handler::HandlerAbort;
use lionweb_chunk::ChunkError;

/// Result alias for deserialization runs
pub type DeserializationResult<T> = Result<T, DeserializationError>;

/// Fatal outcome of a run; no partial graph is returned
#[derive(Debug, thiserror::Error)]
pub enum DeserializationError {
    /// Chunk could not be read
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The handler chose to abort
    #[error("aborted on anomaly: {anomaly}: {source}")]
    Aborted {
        anomaly: Box<Anomaly>,
        #[source]
        source: HandlerAbort,
    },

    /// The handler's substitute failed re-validation
    #[error("invalid substitute {substitute} for anomaly: {anomaly}: {reason}")]
    InvalidSubstitute {
        anomaly: Box<Anomaly>,
        substitute: String,
        reason: String,
    },

    /// Renamed ids kept colliding
    #[error("node id '{id}' still collides after {attempts} renaming attempts")]
    DuplicateIdRetriesExhausted { id: String, attempts: usize },
}

impl DeserializationError {
    /// Anomaly that ended the run, if any
    #[must_use]
    pub fn anomaly(&self) -> Option<&Anomaly> {
        match self {
            Self::Aborted { anomaly, .. } | Self::InvalidSubstitute { anomaly, .. } => {
                Some(anomaly)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_names_anomaly_and_reason() {
        let err = DeserializationError::Aborted {
            anomaly: Box::new(Anomaly::DuplicateNodeId { id: "n1".into() }),
            source: HandlerAbort::new("no duplicates allowed"),
        };
        assert_eq!(
            err.to_string(),
            "aborted on anomaly: node id 'n1' is used more than once: no duplicates allowed"
        );
        assert!(err.anomaly().is_some());
    }

    #[test]
    fn invalid_substitute_names_substitute() {
        let err = DeserializationError::InvalidSubstitute {
            anomaly: Box::new(Anomaly::CircularContainment {
                parent: "a".into(),
                child: "a".into(),
            }),
            substitute: "'a'".into(),
            reason: "still creates a cycle".into(),
        };
        let text = err.to_string();
        assert!(text.contains("'a'"));
        assert!(text.contains("still creates a cycle"));
    }
}
