//! LionCore built-in elements
//!
//! The primitive types every language may use without declaring them, and
//! the universal `Node` concept every classifier conforms to.

use crate::language::{Classifier, Language};
use crate::pointer::MetaPointer;
use crate::value::{PropertyValue, ValueError};

/// Built-ins language key
pub const LANGUAGE_KEY: &str = "LionCore-builtins";

/// Built-ins language version
pub const LANGUAGE_VERSION: &str = "2023.1";

/// Key of the built-in `String` primitive
pub const STRING_KEY: &str = "LionCore-builtins-String";
/// Key of the built-in `Boolean` primitive
pub const BOOLEAN_KEY: &str = "LionCore-builtins-Boolean";
/// Key of the built-in `Integer` primitive
pub const INTEGER_KEY: &str = "LionCore-builtins-Integer";
/// Key of the built-in `JSON` primitive
pub const JSON_KEY: &str = "LionCore-builtins-JSON";
/// Key of the built-in `Node` concept
pub const NODE_KEY: &str = "LionCore-builtins-Node";

fn pointer(key: &str) -> MetaPointer {
    MetaPointer::new(LANGUAGE_KEY, LANGUAGE_VERSION, key)
}

/// `String` primitive
#[must_use]
pub fn string() -> MetaPointer {
    pointer(STRING_KEY)
}

/// `Boolean` primitive
#[must_use]
pub fn boolean() -> MetaPointer {
    pointer(BOOLEAN_KEY)
}

/// `Integer` primitive
#[must_use]
pub fn integer() -> MetaPointer {
    pointer(INTEGER_KEY)
}

/// `JSON` primitive
#[must_use]
pub fn json() -> MetaPointer {
    pointer(JSON_KEY)
}

/// Universal `Node` concept
#[must_use]
pub fn node() -> MetaPointer {
    pointer(NODE_KEY)
}

/// The built-ins as a loadable language
#[must_use]
pub fn language() -> Language {
    Language::new(LANGUAGE_KEY, LANGUAGE_VERSION)
        .named("LionCore_builtins")
        .with_primitive(STRING_KEY, "String")
        .with_primitive(BOOLEAN_KEY, "Boolean")
        .with_primitive(INTEGER_KEY, "Integer")
        .with_primitive(JSON_KEY, "JSON")
        .with_classifier(Classifier::concept(node(), "Node"))
}

/// Parse a raw value of a built-in primitive
///
/// Returns `None` when `ty` is not a built-in primitive.
#[must_use]
pub fn parse(ty: &MetaPointer, raw: &str) -> Option<Result<PropertyValue, ValueError>> {
    if ty.language != LANGUAGE_KEY {
        return None;
    }
    let parsed = match ty.key.as_str() {
        STRING_KEY => Ok(PropertyValue::String(raw.to_string())),
        BOOLEAN_KEY => match raw {
            "true" => Ok(PropertyValue::Boolean(true)),
            "false" => Ok(PropertyValue::Boolean(false)),
            _ => Err(ValueError::malformed(ty, raw, "expected `true` or `false`")),
        },
        INTEGER_KEY => raw
            .parse::<i64>()
            .map(PropertyValue::Integer)
            .map_err(|e| ValueError::malformed(ty, raw, e.to_string())),
        JSON_KEY => serde_json::from_str(raw)
            .map(PropertyValue::Json)
            .map_err(|e| ValueError::malformed(ty, raw, e.to_string())),
        _ => return None,
    };
    Some(parsed)
}

/// Whether `value` is a valid instance of built-in primitive `ty`
///
/// Returns `None` when `ty` is not a built-in primitive.
#[must_use]
pub fn accepts(ty: &MetaPointer, value: &PropertyValue) -> Option<bool> {
    if ty.language != LANGUAGE_KEY {
        return None;
    }
    let ok = match ty.key.as_str() {
        STRING_KEY => matches!(value, PropertyValue::String(_)),
        BOOLEAN_KEY => matches!(value, PropertyValue::Boolean(_)),
        INTEGER_KEY => matches!(value, PropertyValue::Integer(_)),
        JSON_KEY => matches!(value, PropertyValue::Json(_)),
        _ => return None,
    };
    Some(ok)
}
