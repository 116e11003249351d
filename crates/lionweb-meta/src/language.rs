//! Language elements
//!
//! Classifiers, features and datatypes as plain, immutable descriptors.
//! Languages are assembled with the chained `with_*` builders and then
//! loaded into a [`crate::LanguageRegistry`].

use crate::pointer::MetaPointer;
use std::sync::Arc;

/// What a classifier describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    /// Instantiable node type
    Concept,

    /// Abstract contract implemented by concepts
    Interface,

    /// Node type that attaches to a host node as an annotation
    Annotation,
}

/// Node type descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    pointer: MetaPointer,
    name: String,
    kind: ClassifierKind,
    supertypes: Vec<MetaPointer>,
    annotates: Option<MetaPointer>,
    features: Vec<Arc<Feature>>,
}

impl Classifier {
    fn with_kind(pointer: MetaPointer, name: impl Into<String>, kind: ClassifierKind) -> Self {
        Self {
            pointer,
            name: name.into(),
            kind,
            supertypes: Vec::new(),
            annotates: None,
            features: Vec::new(),
        }
    }

    /// New concept
    #[must_use]
    pub fn concept(pointer: MetaPointer, name: impl Into<String>) -> Self {
        Self::with_kind(pointer, name, ClassifierKind::Concept)
    }

    /// New interface
    #[must_use]
    pub fn interface(pointer: MetaPointer, name: impl Into<String>) -> Self {
        Self::with_kind(pointer, name, ClassifierKind::Interface)
    }

    /// New annotation; `annotates` restricts the host classifier
    #[must_use]
    pub fn annotation(
        pointer: MetaPointer,
        name: impl Into<String>,
        annotates: Option<MetaPointer>,
    ) -> Self {
        let mut classifier = Self::with_kind(pointer, name, ClassifierKind::Annotation);
        classifier.annotates = annotates;
        classifier
    }

    /// Add a supertype (extended concept or implemented interface)
    #[must_use]
    pub fn extends(mut self, supertype: MetaPointer) -> Self {
        self.supertypes.push(supertype);
        self
    }

    /// Add a declared feature
    #[must_use]
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(Arc::new(feature));
        self
    }

    /// Metamodel address
    #[inline]
    #[must_use]
    pub fn pointer(&self) -> &MetaPointer {
        &self.pointer
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classifier kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    /// Direct supertypes
    #[inline]
    #[must_use]
    pub fn supertypes(&self) -> &[MetaPointer] {
        &self.supertypes
    }

    /// Host restriction of an annotation (`None` accepts any host)
    #[inline]
    #[must_use]
    pub fn annotates(&self) -> Option<&MetaPointer> {
        self.annotates.as_ref()
    }

    /// Features declared directly on this classifier
    #[inline]
    #[must_use]
    pub fn declared_features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    /// Whether this is an annotation classifier
    #[inline]
    #[must_use]
    pub fn is_annotation(&self) -> bool {
        self.kind == ClassifierKind::Annotation
    }
}

/// Feature slot kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Primitive, enumeration or structured value
    Property,

    /// Owning link to child nodes
    Containment,

    /// Non-owning link to other nodes
    Reference,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Property => "property",
            Self::Containment => "containment",
            Self::Reference => "reference",
        })
    }
}

/// Feature descriptor
///
/// `ty` points to a datatype for properties and to a classifier for links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    key: String,
    name: String,
    kind: FeatureKind,
    ty: MetaPointer,
    optional: bool,
    multiple: bool,
}

impl Feature {
    fn new(key: impl Into<String>, kind: FeatureKind, ty: MetaPointer) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            kind,
            ty,
            optional: false,
            multiple: false,
        }
    }

    /// Required single-valued property
    #[must_use]
    pub fn property(key: impl Into<String>, datatype: MetaPointer) -> Self {
        Self::new(key, FeatureKind::Property, datatype)
    }

    /// Required single-valued containment
    #[must_use]
    pub fn containment(key: impl Into<String>, classifier: MetaPointer) -> Self {
        Self::new(key, FeatureKind::Containment, classifier)
    }

    /// Required single-valued reference
    #[must_use]
    pub fn reference(key: impl Into<String>, classifier: MetaPointer) -> Self {
        Self::new(key, FeatureKind::Reference, classifier)
    }

    /// Set the display name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark as optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark as multi-valued (links only)
    #[must_use]
    pub fn multiple(mut self) -> Self {
        self.multiple = self.kind != FeatureKind::Property;
        self
    }

    /// Feature key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Declared value type
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &MetaPointer {
        &self.ty
    }

    /// Whether the feature may be left unset
    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the feature holds more than one value
    #[inline]
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }
}

/// Primitive datatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveType {
    /// Metamodel address
    pub pointer: MetaPointer,
    /// Display name
    pub name: String,
}

/// Enumeration literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumLiteral {
    /// Owning enumeration
    pub enumeration: MetaPointer,
    /// Literal key
    pub key: String,
    /// Display name
    pub name: String,
}

/// Enumeration datatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pointer: MetaPointer,
    name: String,
    literals: Vec<EnumLiteral>,
}

impl Enumeration {
    /// New enumeration without literals
    #[must_use]
    pub fn new(pointer: MetaPointer, name: impl Into<String>) -> Self {
        Self {
            pointer,
            name: name.into(),
            literals: Vec::new(),
        }
    }

    /// Add a literal (name defaults to the key)
    #[must_use]
    pub fn with_literal(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.literals.push(EnumLiteral {
            enumeration: self.pointer.clone(),
            name: key.clone(),
            key,
        });
        self
    }

    /// Metamodel address
    #[inline]
    #[must_use]
    pub fn pointer(&self) -> &MetaPointer {
        &self.pointer
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared literals
    #[inline]
    #[must_use]
    pub fn literals(&self) -> &[EnumLiteral] {
        &self.literals
    }

    /// Literal by key
    #[must_use]
    pub fn literal(&self, key: &str) -> Option<&EnumLiteral> {
        self.literals.iter().find(|l| l.key == key)
    }

    /// Whether `literal` is one of this enumeration's literals
    #[must_use]
    pub fn owns(&self, literal: &EnumLiteral) -> bool {
        literal.enumeration == self.pointer && self.literal(&literal.key).is_some()
    }
}

/// Field of a structured datatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field key
    pub key: String,
    /// Field datatype
    pub ty: MetaPointer,
}

/// Record-like datatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredDataType {
    pointer: MetaPointer,
    name: String,
    fields: Vec<Field>,
}

impl StructuredDataType {
    /// New structured datatype without fields
    #[must_use]
    pub fn new(pointer: MetaPointer, name: impl Into<String>) -> Self {
        Self {
            pointer,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, ty: MetaPointer) -> Self {
        self.fields.push(Field {
            key: key.into(),
            ty,
        });
        self
    }

    /// Metamodel address
    #[inline]
    #[must_use]
    pub fn pointer(&self) -> &MetaPointer {
        &self.pointer
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by key
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }
}

/// Any datatype a property may declare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// Primitive (built-in or language-defined)
    Primitive(Arc<PrimitiveType>),
    /// Enumeration
    Enumeration(Arc<Enumeration>),
    /// Structured datatype
    Structured(Arc<StructuredDataType>),
}

impl DataType {
    /// Metamodel address
    #[must_use]
    pub fn pointer(&self) -> &MetaPointer {
        match self {
            Self::Primitive(p) => &p.pointer,
            Self::Enumeration(e) => e.pointer(),
            Self::Structured(s) => s.pointer(),
        }
    }
}

/// A language version and its elements
#[derive(Debug, Clone, Default)]
pub struct Language {
    key: String,
    version: String,
    name: String,
    classifiers: Vec<Classifier>,
    datatypes: Vec<DataType>,
}

impl Language {
    /// New empty language
    #[must_use]
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            version: version.into(),
            ..Self::default()
        }
    }

    /// Pointer to an element of this language
    #[must_use]
    pub fn pointer(&self, key: impl Into<String>) -> MetaPointer {
        MetaPointer::new(self.key.clone(), self.version.clone(), key)
    }

    /// Set the display name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifiers.push(classifier);
        self
    }

    /// Add a primitive datatype
    #[must_use]
    pub fn with_primitive(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        let pointer = self.pointer(key);
        self.datatypes.push(DataType::Primitive(Arc::new(PrimitiveType {
            pointer,
            name: name.into(),
        })));
        self
    }

    /// Add an enumeration
    #[must_use]
    pub fn with_enumeration(mut self, enumeration: Enumeration) -> Self {
        self.datatypes.push(DataType::Enumeration(Arc::new(enumeration)));
        self
    }

    /// Add a structured datatype
    #[must_use]
    pub fn with_structured(mut self, structured: StructuredDataType) -> Self {
        self.datatypes.push(DataType::Structured(Arc::new(structured)));
        self
    }

    /// Language key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Language version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classifiers of this language
    #[inline]
    #[must_use]
    pub fn classifiers(&self) -> &[Classifier] {
        &self.classifiers
    }

    /// Datatypes of this language
    #[inline]
    #[must_use]
    pub fn datatypes(&self) -> &[DataType] {
        &self.datatypes
    }
}
