//! Typed property values
//!
//! Provides [`PropertyValue`], the result of parsing a raw wire string
//! against a property's declared datatype.

use crate::language::EnumLiteral;
use crate::pointer::MetaPointer;
use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};

/// Parsed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Built-in `String`
    String(String),

    /// Built-in `Boolean`
    Boolean(bool),

    /// Built-in `Integer`
    Integer(i64),

    /// Built-in `JSON`
    Json(serde_json::Value),

    /// Enumeration literal
    Enum(EnumLiteral),

    /// Structured datatype instance
    Structured(StructuredValue),

    /// Language-defined primitive, kept as its raw text
    Custom {
        /// Declared primitive type
        ty: MetaPointer,
        /// Wire text
        raw: String,
    },
}

impl PropertyValue {
    /// Short description of the value's shape (for diagnostics)
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Json(_) => "json",
            Self::Enum(_) => "enumeration literal",
            Self::Structured(_) => "structured value",
            Self::Custom { .. } => "custom primitive",
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Json(j) => write!(f, "{j}"),
            Self::Enum(l) => write!(f, "{}#{}", l.enumeration.key, l.key),
            Self::Structured(s) => write!(f, "{}{{{} fields}}", s.ty.key, s.fields.len()),
            Self::Custom { ty, raw } => write!(f, "{}({raw:?})", ty.key),
        }
    }
}

/// Instance of a structured datatype
///
/// Fields absent from `fields` are unset, which is distinct from any
/// default value of the field's type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredValue {
    /// Structured datatype
    pub ty: MetaPointer,

    /// Set fields by key, in wire order
    pub fields: IndexMap<String, PropertyValue>,
}

impl StructuredValue {
    /// Empty instance (every field unset)
    #[must_use]
    pub fn new(ty: MetaPointer) -> Self {
        Self {
            ty,
            fields: IndexMap::new(),
        }
    }

    /// Value of a field, if set
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.fields.get(key)
    }
}

/// Failure to turn a raw string into a typed value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// Text does not match the datatype's syntax
    #[error("cannot parse {raw:?} as {ty}: {reason}")]
    Malformed {
        ty: MetaPointer,
        raw: String,
        reason: String,
    },

    /// Structured value names a field its datatype does not declare
    #[error("structured type {ty} has no field '{field}'")]
    UnknownField { ty: MetaPointer, field: String },

    /// A structured field declares a datatype the registry does not know
    #[error("field '{field}' of {ty} has unknown datatype {field_ty}")]
    UnknownFieldType {
        ty: MetaPointer,
        field: String,
        field_ty: MetaPointer,
    },
}

impl ValueError {
    /// Create a malformed-text error
    pub fn malformed(ty: &MetaPointer, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            ty: ty.clone(),
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}
