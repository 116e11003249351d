//! LionWeb Identifier Codec
//!
//! Reversible compact encoding of node identifiers.
//!
//! # Core Concepts
//!
//! - [`codec`]: 4 symbols of the `[0-9A-Za-z-_]` alphabet pack into 3 bytes
//! - [`CompressedId`]: packed-or-raw identity key used for all comparisons
//! - [`NodeId`]: compressed key plus (optionally) the original text
//! - [`IdMode`]: whether the codec is used for a deserialization run
//!
//! # Example
//!
//! ```rust
//! use lionweb_ids::{CompressedId, IdMode};
//!
//! let id = CompressedId::compress("node-001");
//! assert!(id.is_packed());
//! assert_eq!(id.to_text(), "node-001");
//!
//! // Identifiers outside the alphabet are kept verbatim
//! let raw = IdMode::default().node_id("lib:node/1");
//! assert!(!raw.compressed().is_packed());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod codec;
mod id;

pub use id::{CompressedId, IdMode, NodeId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
