//! Serialized chunk records
//!
//! Flat, order-independent node records exactly as they travel on the wire.
//! Nothing here is validated against a metamodel; ids are plain strings.

use lionweb_meta::MetaPointer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Serialization format version this crate reads and writes
pub const SERIALIZATION_FORMAT_VERSION: &str = "2023.1";

/// One unit of serialized nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedChunk {
    /// Wire format version
    pub serialization_format_version: String,

    /// Languages the nodes are declared to use
    #[serde(default)]
    pub languages: Vec<UsedLanguage>,

    /// Node records; order only matters as a tie-break
    #[serde(default)]
    pub nodes: Vec<SerializedNode>,
}

impl SerializedChunk {
    /// Empty chunk in the current format version
    #[must_use]
    pub fn new() -> Self {
        Self {
            serialization_format_version: SERIALIZATION_FORMAT_VERSION.to_string(),
            languages: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Declare a used language
    #[must_use]
    pub fn with_language(mut self, key: impl Into<String>, version: impl Into<String>) -> Self {
        self.languages.push(UsedLanguage {
            key: key.into(),
            version: version.into(),
        });
        self
    }

    /// Append a node record
    #[must_use]
    pub fn with_node(mut self, node: SerializedNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Whether `(key, version)` is declared in `languages`
    #[must_use]
    pub fn declares_language(&self, key: &str, version: &str) -> bool {
        self.languages
            .iter()
            .any(|l| l.key == key && l.version == version)
    }

    /// Languages referenced by node records but missing from `languages`
    ///
    /// Sorted and deduplicated.
    #[must_use]
    pub fn undeclared_languages(&self) -> Vec<UsedLanguage> {
        let mut missing = BTreeSet::new();
        for node in &self.nodes {
            for pointer in node.meta_pointers() {
                if !self.declares_language(&pointer.language, &pointer.version) {
                    missing.insert((pointer.language.clone(), pointer.version.clone()));
                }
            }
        }
        missing
            .into_iter()
            .map(|(key, version)| UsedLanguage { key, version })
            .collect()
    }
}

impl Default for SerializedChunk {
    fn default() -> Self {
        Self::new()
    }
}

/// Language reference of a chunk
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsedLanguage {
    /// Language key
    pub key: String,
    /// Language version
    pub version: String,
}

/// Serialized node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    /// Node id (may collide with another record)
    pub id: String,

    /// Classifier the node instantiates
    pub classifier: MetaPointer,

    /// Property values as raw strings
    #[serde(default)]
    pub properties: Vec<SerializedProperty>,

    /// Child ids per containment
    #[serde(default)]
    pub containments: Vec<SerializedContainment>,

    /// Target entries per reference
    #[serde(default)]
    pub references: Vec<SerializedReference>,

    /// Annotation node ids
    #[serde(default)]
    pub annotations: Vec<String>,

    /// Declared parent id
    #[serde(default)]
    pub parent: Option<String>,
}

impl SerializedNode {
    /// Record with no features
    #[must_use]
    pub fn new(id: impl Into<String>, classifier: MetaPointer) -> Self {
        Self {
            id: id.into(),
            classifier,
            properties: Vec::new(),
            containments: Vec::new(),
            references: Vec::new(),
            annotations: Vec::new(),
            parent: None,
        }
    }

    /// Add a property value
    #[must_use]
    pub fn with_property(mut self, property: MetaPointer, value: Option<&str>) -> Self {
        self.properties.push(SerializedProperty {
            property,
            value: value.map(str::to_string),
        });
        self
    }

    /// Add a containment with its child ids
    #[must_use]
    pub fn with_children<I, S>(mut self, containment: MetaPointer, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.containments.push(SerializedContainment {
            containment,
            children: children.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a reference whose entries all carry a target id
    #[must_use]
    pub fn with_targets<I, S>(self, reference: MetaPointer, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = targets
            .into_iter()
            .map(|t| ReferenceTarget {
                reference: Some(t.into()),
                resolve_info: None,
            })
            .collect();
        self.with_reference_entries(reference, entries)
    }

    /// Add a reference with explicit entries
    #[must_use]
    pub fn with_reference_entries(
        mut self,
        reference: MetaPointer,
        targets: Vec<ReferenceTarget>,
    ) -> Self {
        self.references.push(SerializedReference { reference, targets });
        self
    }

    /// Add an annotation id
    #[must_use]
    pub fn with_annotation(mut self, id: impl Into<String>) -> Self {
        self.annotations.push(id.into());
        self
    }

    /// Set the declared parent id
    #[must_use]
    pub fn with_parent(mut self, id: impl Into<String>) -> Self {
        self.parent = Some(id.into());
        self
    }

    /// Every metamodel pointer this record mentions
    pub fn meta_pointers(&self) -> impl Iterator<Item = &MetaPointer> {
        std::iter::once(&self.classifier)
            .chain(self.properties.iter().map(|p| &p.property))
            .chain(self.containments.iter().map(|c| &c.containment))
            .chain(self.references.iter().map(|r| &r.reference))
    }

    /// Ids this record points at through containments, references and annotations
    pub fn linked_ids(&self) -> impl Iterator<Item = &str> {
        self.containments
            .iter()
            .flat_map(|c| c.children.iter().map(String::as_str))
            .chain(
                self.references
                    .iter()
                    .flat_map(|r| r.targets.iter().filter_map(|t| t.reference.as_deref())),
            )
            .chain(self.annotations.iter().map(String::as_str))
    }
}

/// Raw property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedProperty {
    /// Property feature
    pub property: MetaPointer,
    /// Raw value; `None` means unset
    pub value: Option<String>,
}

/// Child ids of one containment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedContainment {
    /// Containment feature
    pub containment: MetaPointer,
    /// Child ids in order
    #[serde(default)]
    pub children: Vec<String>,
}

/// Target entries of one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedReference {
    /// Reference feature
    pub reference: MetaPointer,
    /// Target entries in order
    #[serde(default)]
    pub targets: Vec<ReferenceTarget>,
}

/// One reference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTarget {
    /// Textual hint for resolving the target outside this chunk
    #[serde(default)]
    pub resolve_info: Option<String>,

    /// Target node id
    #[serde(default)]
    pub reference: Option<String>,
}

impl ReferenceTarget {
    /// Entry pointing at `id`
    #[must_use]
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            reference: Some(id.into()),
            resolve_info: None,
        }
    }

    /// Entry with only a resolve hint
    #[must_use]
    pub fn unresolved(resolve_info: impl Into<String>) -> Self {
        Self {
            reference: None,
            resolve_info: Some(resolve_info.into()),
        }
    }
}
