//! LionWeb Chunk Deserialization
//!
//! Rebuilds a typed node graph from a flat serialization chunk, checking
//! every record against a [`Metamodel`](lionweb_meta::Metamodel) and
//! routing each inconsistency through a pluggable [`AnomalyHandler`].
//!
//! # Pipeline
//!
//! 1. Instantiate: one node per record; ids normalized through the
//!    [`lionweb_ids`] codec, classifiers resolved, properties parsed.
//! 2. Link: containments, references and annotations resolved against the
//!    complete id table, so records may arrive in any order.
//! 3. Parents: declared parent pointers compared with actual containment.
//!
//! The result is a [`NodeGraph`] that is a forest: every node has at most
//! one parent and no node contains itself.
//!
//! # Example
//!
//! ```rust
//! use lionweb_chunk::{SerializedChunk, SerializedNode};
//! use lionweb_deser::{AnomalyKind, Deserializer, IgnoringHandler};
//! use lionweb_meta::{builtins, LanguageRegistry, MetaPointer};
//!
//! let registry = LanguageRegistry::builder().build().unwrap();
//! let chunk = SerializedChunk::new()
//!     .with_node(SerializedNode::new("a", builtins::node()))
//!     .with_node(SerializedNode::new("b", MetaPointer::new("gone", "1", "X")));
//!
//! let result = Deserializer::new(&registry)
//!     .deserialize(&chunk, &mut IgnoringHandler)
//!     .unwrap();
//! assert_eq!(result.roots.len(), 1);
//! assert_eq!(result.report.count(AnomalyKind::UnknownClassifier), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod anomaly;
mod config;
mod dependent;
mod error;
mod graph;
mod handler;
mod pipeline;
mod report;

pub use anomaly::{Anomaly, AnomalyKind, Outcome};
pub use config::{ConfigError, DeserializerConfig, DEFAULT_MAX_DUPLICATE_ID_RETRIES};
pub use dependent::{DependentNode, DependentNodes};
pub use error::{DeserializationError, DeserializationResult};
pub use graph::{
    Ancestors, GraphError, Node, NodeGraph, NodeOrigin, NodeRef, ParentLink, ReferenceValue, Slot,
};
pub use handler::{
    AnomalyHandler, HandlerAbort, Healing, IgnoringHandler, LinkValues, RecordingHandler,
    StrictHandler,
};
pub use pipeline::{Deserialized, Deserializer};
pub use report::{AnomalyRecord, DeserializationReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a deserialization
    pub use crate::{
        AnomalyHandler, AnomalyKind, Deserialized, Deserializer, DeserializerConfig,
        IgnoringHandler, NodeGraph, NodeRef, StrictHandler,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
