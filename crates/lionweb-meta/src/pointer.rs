//! Metamodel addressing
//!
//! Provides [`MetaPointer`], the `(language, version, key)` triple used to
//! address classifiers, features and datatypes across language boundaries.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Address of a metamodel element
///
/// # Example
/// ```
/// use lionweb_meta::MetaPointer;
///
/// let book = MetaPointer::new("library", "1", "library-Book");
/// assert_eq!(book.to_string(), "library@1#library-Book");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetaPointer {
    /// Language key
    pub language: String,

    /// Language version
    pub version: String,

    /// Element key within the language
    pub key: String,
}

impl MetaPointer {
    /// Create a pointer
    #[inline]
    #[must_use]
    pub fn new(
        language: impl Into<String>,
        version: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            version: version.into(),
            key: key.into(),
        }
    }

    /// Pointer to another element of the same language
    #[inline]
    #[must_use]
    pub fn sibling(&self, key: impl Into<String>) -> Self {
        Self {
            language: self.language.clone(),
            version: self.version.clone(),
            key: key.into(),
        }
    }

    /// Whether both pointers address the same language version
    #[inline]
    #[must_use]
    pub fn same_language(&self, other: &MetaPointer) -> bool {
        self.language == other.language && self.version == other.version
    }
}

impl Display for MetaPointer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.language, self.version, self.key)
    }
}
