//! LionWeb Metamodel Lookup
//!
//! Reflective descriptors for languages and the read-only lookup service the
//! deserializer consults for every classifier, feature and datatype.
//!
//! # Overview
//!
//! - [`MetaPointer`]: `(language, version, key)` element address
//! - [`Classifier`], [`Feature`], [`DataType`]: immutable descriptors
//! - [`Metamodel`]: the lookup contract consumed by the deserializer
//! - [`LanguageRegistry`]: in-memory [`Metamodel`] built once per language set
//! - [`PropertyValue`]: typed property values produced by parsing
//!
//! # Example
//!
//! ```rust
//! use lionweb_meta::{builtins, Classifier, Feature, Language, LanguageRegistry, Metamodel};
//!
//! let lang = Language::new("library", "1");
//! let book = lang.pointer("Book");
//! let lang = lang.with_classifier(
//!     Classifier::concept(book.clone(), "Book")
//!         .with_feature(Feature::property("pages", builtins::integer())),
//! );
//! let registry = LanguageRegistry::builder().language(lang).build().unwrap();
//!
//! let classifier = registry.classifier(&book).unwrap();
//! let pages = registry.feature(&classifier, "pages").unwrap();
//! assert!(registry.datatype(pages.ty()).is_some());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builtins;
mod language;
mod pointer;
mod registry;
mod value;

pub use language::{
    Classifier, ClassifierKind, DataType, EnumLiteral, Enumeration, Feature, FeatureKind, Field,
    Language, PrimitiveType, StructuredDataType,
};
pub use pointer::MetaPointer;
pub use registry::{LanguageRegistry, MetaError, Metamodel, RegistryBuilder};
pub use value::{PropertyValue, StructuredValue, ValueError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for metamodel lookups
    pub use crate::{
        Classifier, DataType, Feature, FeatureKind, LanguageRegistry, MetaPointer, Metamodel,
        PropertyValue,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
