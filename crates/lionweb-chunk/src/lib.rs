//! LionWeb Chunk Model
//!
//! The wire-level shape consumed by the deserializer: a list of used
//! languages and a flat list of node records whose links are plain ids.
//!
//! # Example
//!
//! ```rust
//! use lionweb_chunk::{SerializedChunk, SerializedNode};
//! use lionweb_meta::MetaPointer;
//!
//! let library = MetaPointer::new("library", "1", "Library");
//! let books = MetaPointer::new("library", "1", "books");
//!
//! let chunk = SerializedChunk::new()
//!     .with_language("library", "1")
//!     .with_node(SerializedNode::new("lib", library).with_children(books, ["b1"]));
//!
//! let json = chunk.to_json_string().unwrap();
//! assert_eq!(SerializedChunk::from_json_str(&json).unwrap(), chunk);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod json;
mod model;

pub use error::{ChunkError, ChunkResult};
pub use model::{
    ReferenceTarget, SerializedChunk, SerializedContainment, SerializedNode, SerializedProperty,
    SerializedReference, UsedLanguage, SERIALIZATION_FORMAT_VERSION,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
