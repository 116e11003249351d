//! Metamodel lookup
//!
//! Provides the [`Metamodel`] trait consumed by the deserializer and
//! [`LanguageRegistry`], an in-memory implementation built once per set of
//! loaded languages and read-only afterwards.

use crate::builtins;
use crate::language::{
    Classifier, DataType, EnumLiteral, Enumeration, Feature, Language, PrimitiveType,
    StructuredDataType,
};
use crate::pointer::MetaPointer;
use crate::value::{PropertyValue, StructuredValue, ValueError};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Reflective metamodel queries
///
/// Every method is a pure read; implementations must be safe to share
/// between threads resolving independent chunks.
pub trait Metamodel: Send + Sync {
    /// Classifier by `(language, version, key)`
    fn classifier(&self, pointer: &MetaPointer) -> Option<Arc<Classifier>>;

    /// Feature of `classifier` (declared or inherited) by key
    fn feature(&self, classifier: &Classifier, key: &str) -> Option<Arc<Feature>>;

    /// All features of `classifier`, supertypes first
    fn features(&self, classifier: &Classifier) -> Vec<Arc<Feature>>;

    /// Datatype by pointer
    fn datatype(&self, pointer: &MetaPointer) -> Option<DataType>;

    /// Parse a raw string as a primitive value
    fn parse(&self, primitive: &PrimitiveType, raw: &str) -> Result<PropertyValue, ValueError>;

    /// Parse a raw JSON object as a structured value
    fn parse_structured(
        &self,
        structured: &StructuredDataType,
        raw: &str,
    ) -> Result<PropertyValue, ValueError>;

    /// Literal of `enumeration` by key
    fn enumeration_literal(&self, enumeration: &Enumeration, key: &str) -> Option<EnumLiteral>;

    /// Whether `annotation` may annotate a node of classifier `host`
    fn is_valid_annotation_target(&self, annotation: &Classifier, host: &Classifier) -> bool;

    /// Whether `classifier` is `expected` or one of its subtypes
    fn conforms_to(&self, classifier: &Classifier, expected: &MetaPointer) -> bool;

    /// Whether `value` is a valid instance of `datatype`
    fn accepts(&self, datatype: &DataType, value: &PropertyValue) -> bool;
}

/// Errors while loading languages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    /// Two elements share one pointer
    #[error("duplicate metamodel element: {0}")]
    DuplicateElement(MetaPointer),

    /// The same language version was loaded twice
    #[error("language '{key}' version '{version}' is already loaded")]
    DuplicateLanguage { key: String, version: String },

    /// A classifier extends something that is not a loaded classifier
    #[error("classifier {classifier} has unknown supertype {supertype}")]
    UnknownSupertype {
        classifier: MetaPointer,
        supertype: MetaPointer,
    },

    /// Inheritance loops back on itself
    #[error("cyclic inheritance through {0}")]
    CyclicInheritance(MetaPointer),
}

/// In-memory metamodel
///
/// Inherited features and transitive supertypes are flattened at build time
/// so lookups during deserialization are single hash probes.
///
/// # Example
/// ```
/// use lionweb_meta::{builtins, Classifier, Feature, Language, LanguageRegistry, Metamodel};
///
/// let lang = Language::new("library", "1");
/// let book = lang.pointer("Book");
/// let lang = lang.with_classifier(
///     Classifier::concept(book.clone(), "Book")
///         .with_feature(Feature::property("title", builtins::string())),
/// );
///
/// let registry = LanguageRegistry::builder().language(lang).build().unwrap();
/// let classifier = registry.classifier(&book).unwrap();
/// assert!(registry.feature(&classifier, "title").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<(String, String)>,
    classifiers: HashMap<MetaPointer, Arc<Classifier>>,
    datatypes: HashMap<MetaPointer, DataType>,
    features: HashMap<MetaPointer, IndexMap<String, Arc<Feature>>>,
    ancestors: HashMap<MetaPointer, HashSet<MetaPointer>>,
}

impl LanguageRegistry {
    /// Start a registry; the built-ins language is always included
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            languages: vec![builtins::language()],
        }
    }

    /// Loaded `(key, version)` pairs, built-ins first
    #[inline]
    #[must_use]
    pub fn languages(&self) -> &[(String, String)] {
        &self.languages
    }

    /// Whether a language version is loaded
    #[must_use]
    pub fn has_language(&self, key: &str, version: &str) -> bool {
        self.languages.iter().any(|(k, v)| k == key && v == version)
    }

    /// Number of loaded classifiers
    #[inline]
    #[must_use]
    pub fn classifier_count(&self) -> usize {
        self.classifiers.len()
    }

    /// All features of a classifier in declaration order, supertypes first
    #[must_use]
    pub fn all_features(&self, classifier: &MetaPointer) -> Vec<Arc<Feature>> {
        self.features
            .get(classifier)
            .map(|f| f.values().cloned().collect())
            .unwrap_or_default()
    }

    fn parse_field(
        &self,
        structured: &StructuredDataType,
        key: &str,
        raw: &serde_json::Value,
    ) -> Result<PropertyValue, ValueError> {
        let field = structured
            .field(key)
            .ok_or_else(|| ValueError::UnknownField {
                ty: structured.pointer().clone(),
                field: key.to_string(),
            })?;
        let unknown = || ValueError::UnknownFieldType {
            ty: structured.pointer().clone(),
            field: key.to_string(),
            field_ty: field.ty.clone(),
        };
        let datatype = self.datatype(&field.ty).ok_or_else(unknown)?;

        match (&datatype, raw) {
            (DataType::Structured(nested), serde_json::Value::Object(_)) => {
                self.parse_structured(nested, &raw.to_string())
            }
            (DataType::Primitive(p), serde_json::Value::String(text)) => self.parse(p, text),
            (DataType::Enumeration(e), serde_json::Value::String(text)) => self
                .enumeration_literal(e, text)
                .map(PropertyValue::Enum)
                .ok_or_else(|| ValueError::malformed(e.pointer(), text.clone(), "unknown literal")),
            _ => Err(ValueError::malformed(
                datatype.pointer(),
                raw.to_string(),
                "unexpected JSON shape for field",
            )),
        }
    }
}

impl Metamodel for LanguageRegistry {
    fn classifier(&self, pointer: &MetaPointer) -> Option<Arc<Classifier>> {
        self.classifiers.get(pointer).cloned()
    }

    fn feature(&self, classifier: &Classifier, key: &str) -> Option<Arc<Feature>> {
        match self.features.get(classifier.pointer()) {
            Some(features) => features.get(key).cloned(),
            // Classifier not loaded here (e.g. supplied by a handler)
            None => classifier
                .declared_features()
                .iter()
                .find(|f| f.key() == key)
                .cloned(),
        }
    }

    fn features(&self, classifier: &Classifier) -> Vec<Arc<Feature>> {
        match self.features.get(classifier.pointer()) {
            Some(features) => features.values().cloned().collect(),
            None => classifier.declared_features().to_vec(),
        }
    }

    fn datatype(&self, pointer: &MetaPointer) -> Option<DataType> {
        self.datatypes.get(pointer).cloned()
    }

    fn parse(&self, primitive: &PrimitiveType, raw: &str) -> Result<PropertyValue, ValueError> {
        match builtins::parse(&primitive.pointer, raw) {
            Some(parsed) => parsed,
            None => Ok(PropertyValue::Custom {
                ty: primitive.pointer.clone(),
                raw: raw.to_string(),
            }),
        }
    }

    fn parse_structured(
        &self,
        structured: &StructuredDataType,
        raw: &str,
    ) -> Result<PropertyValue, ValueError> {
        let json: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| ValueError::malformed(structured.pointer(), raw, e.to_string()))?;
        let serde_json::Value::Object(members) = json else {
            return Err(ValueError::malformed(structured.pointer(), raw, "expected a JSON object"));
        };

        let mut value = StructuredValue::new(structured.pointer().clone());
        for (key, member) in &members {
            if member.is_null() {
                // Explicit null leaves the field unset
                if structured.field(key).is_none() {
                    return Err(ValueError::UnknownField {
                        ty: structured.pointer().clone(),
                        field: key.clone(),
                    });
                }
                continue;
            }
            let parsed = self.parse_field(structured, key, member)?;
            value.fields.insert(key.clone(), parsed);
        }
        Ok(PropertyValue::Structured(value))
    }

    fn enumeration_literal(&self, enumeration: &Enumeration, key: &str) -> Option<EnumLiteral> {
        enumeration.literal(key).cloned()
    }

    fn is_valid_annotation_target(&self, annotation: &Classifier, host: &Classifier) -> bool {
        if !annotation.is_annotation() {
            return false;
        }
        match annotation.annotates() {
            Some(target) => self.conforms_to(host, target),
            None => true,
        }
    }

    fn conforms_to(&self, classifier: &Classifier, expected: &MetaPointer) -> bool {
        if classifier.pointer() == expected || *expected == builtins::node() {
            return true;
        }
        match self.ancestors.get(classifier.pointer()) {
            Some(ancestors) => ancestors.contains(expected),
            None => classifier.supertypes().contains(expected),
        }
    }

    fn accepts(&self, datatype: &DataType, value: &PropertyValue) -> bool {
        match datatype {
            DataType::Primitive(p) => match builtins::accepts(&p.pointer, value) {
                Some(ok) => ok,
                None => matches!(value, PropertyValue::Custom { ty, .. } if *ty == p.pointer),
            },
            DataType::Enumeration(e) => {
                matches!(value, PropertyValue::Enum(literal) if e.owns(literal))
            }
            DataType::Structured(s) => {
                matches!(value, PropertyValue::Structured(v) if v.ty == *s.pointer())
            }
        }
    }
}

/// Collects languages before the lookup tables are built
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    languages: Vec<Language>,
}

impl RegistryBuilder {
    /// Add a language
    #[must_use]
    pub fn language(mut self, language: Language) -> Self {
        self.languages.push(language);
        self
    }

    /// Build the lookup tables
    ///
    /// # Errors
    /// Fails on duplicate languages or elements, unknown supertypes and
    /// inheritance cycles.
    pub fn build(self) -> Result<LanguageRegistry, MetaError> {
        let mut languages = Vec::with_capacity(self.languages.len());
        let mut classifiers = HashMap::new();
        let mut datatypes = HashMap::new();

        for language in &self.languages {
            let id = (language.key().to_string(), language.version().to_string());
            if languages.contains(&id) {
                return Err(MetaError::DuplicateLanguage {
                    key: id.0,
                    version: id.1,
                });
            }
            languages.push(id);

            for classifier in language.classifiers() {
                let pointer = classifier.pointer().clone();
                if classifiers.contains_key(&pointer) {
                    return Err(MetaError::DuplicateElement(pointer));
                }
                classifiers.insert(pointer, Arc::new(classifier.clone()));
            }
            for datatype in language.datatypes() {
                let pointer = datatype.pointer().clone();
                if datatypes.contains_key(&pointer) || classifiers.contains_key(&pointer) {
                    return Err(MetaError::DuplicateElement(pointer));
                }
                datatypes.insert(pointer, datatype.clone());
            }
            tracing::debug!(
                "Loaded language {}@{} ({} classifiers, {} datatypes)",
                language.key(),
                language.version(),
                language.classifiers().len(),
                language.datatypes().len()
            );
        }

        let mut flattener = Flattener {
            classifiers: &classifiers,
            ancestors: HashMap::new(),
            features: HashMap::new(),
            visiting: HashSet::new(),
        };
        for pointer in classifiers.keys() {
            flattener.flatten(pointer)?;
        }
        let Flattener {
            ancestors, features, ..
        } = flattener;

        Ok(LanguageRegistry {
            languages,
            classifiers,
            datatypes,
            features,
            ancestors,
        })
    }
}

/// Depth-first computation of transitive supertypes and inherited features
struct Flattener<'a> {
    classifiers: &'a HashMap<MetaPointer, Arc<Classifier>>,
    ancestors: HashMap<MetaPointer, HashSet<MetaPointer>>,
    features: HashMap<MetaPointer, IndexMap<String, Arc<Feature>>>,
    visiting: HashSet<MetaPointer>,
}

impl Flattener<'_> {
    fn flatten(&mut self, pointer: &MetaPointer) -> Result<(), MetaError> {
        if self.ancestors.contains_key(pointer) {
            return Ok(());
        }
        if !self.visiting.insert(pointer.clone()) {
            return Err(MetaError::CyclicInheritance(pointer.clone()));
        }

        let classifier = Arc::clone(&self.classifiers[pointer]);
        let mut ancestors = HashSet::new();
        let mut features = IndexMap::new();

        for supertype in classifier.supertypes() {
            if !self.classifiers.contains_key(supertype) {
                return Err(MetaError::UnknownSupertype {
                    classifier: pointer.clone(),
                    supertype: supertype.clone(),
                });
            }
            self.flatten(supertype)?;
            ancestors.insert(supertype.clone());
            ancestors.extend(self.ancestors[supertype].iter().cloned());
            for (key, feature) in &self.features[supertype] {
                features
                    .entry(key.clone())
                    .or_insert_with(|| Arc::clone(feature));
            }
        }
        for feature in classifier.declared_features() {
            features.insert(feature.key().to_string(), Arc::clone(feature));
        }

        self.visiting.remove(pointer);
        self.ancestors.insert(pointer.clone(), ancestors);
        self.features.insert(pointer.clone(), features);
        Ok(())
    }
}
