//! Anomalies detected while resolving a chunk
//!
//! Each [`Anomaly`] describes one inconsistency in terms of wire ids and
//! metamodel keys so it stays meaningful after the run.

use lionweb_meta::{FeatureKind, MetaPointer};
use std::fmt::{self, Display, Formatter};

/// Anomaly categories, one per handler decision point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnomalyKind {
    /// Classifier pointer not in the metamodel
    UnknownClassifier,
    /// Feature key not on the node's classifier
    UnknownFeature,
    /// Feature exists but is of another kind
    InvalidFeature,
    /// Raw value does not parse against the property's datatype
    InvalidPropertyValue,
    /// Property datatype not in the metamodel
    UnknownDatatype,
    /// Enumeration has no literal with the given key
    UnknownEnumerationLiteral,
    /// Link values violate the feature's type or cardinality
    InvalidLinkValue,
    /// Child id not found
    UnresolvableChild,
    /// Reference target id not found
    UnresolvableReferenceTarget,
    /// Annotation id not found
    UnresolvableAnnotation,
    /// Declared parent id not found
    UnresolvableParent,
    /// A containment edge would close a loop
    CircularContainment,
    /// A node is listed under a second parent
    DuplicateContainment,
    /// Two records share one id
    DuplicateNodeId,
    /// Annotation does not fit its host
    InvalidAnnotation,
    /// A chunk record repeats a dependent node
    SkipDeserializingDependentNode,
}

impl AnomalyKind {
    /// Every kind, in declaration order
    pub const ALL: [AnomalyKind; 16] = [
        Self::UnknownClassifier,
        Self::UnknownFeature,
        Self::InvalidFeature,
        Self::InvalidPropertyValue,
        Self::UnknownDatatype,
        Self::UnknownEnumerationLiteral,
        Self::InvalidLinkValue,
        Self::UnresolvableChild,
        Self::UnresolvableReferenceTarget,
        Self::UnresolvableAnnotation,
        Self::UnresolvableParent,
        Self::CircularContainment,
        Self::DuplicateContainment,
        Self::DuplicateNodeId,
        Self::InvalidAnnotation,
        Self::SkipDeserializingDependentNode,
    ];
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One detected inconsistency
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Anomaly {
    /// Classifier pointer not in the metamodel
    #[error("node '{node}' has unknown classifier {classifier}")]
    UnknownClassifier { node: String, classifier: MetaPointer },

    /// Feature key not on the node's classifier
    #[error("node '{node}': classifier has no {kind} {feature}")]
    UnknownFeature {
        node: String,
        feature: MetaPointer,
        kind: FeatureKind,
    },

    /// Feature used as the wrong kind
    #[error("node '{node}': feature '{feature}' is a {actual}, expected a {expected}")]
    InvalidFeature {
        node: String,
        feature: String,
        expected: FeatureKind,
        actual: FeatureKind,
    },

    /// Raw property value failed to parse
    #[error("node '{node}': invalid value {raw:?} for property '{feature}': {reason}")]
    InvalidPropertyValue {
        node: String,
        feature: String,
        raw: String,
        reason: String,
    },

    /// Property datatype not in the metamodel
    #[error("node '{node}': property '{feature}' has unknown datatype {datatype}")]
    UnknownDatatype {
        node: String,
        feature: String,
        datatype: MetaPointer,
    },

    /// Enumeration literal key not found
    #[error("node '{node}': enumeration {enumeration} has no literal '{literal}' (property '{feature}')")]
    UnknownEnumerationLiteral {
        node: String,
        feature: String,
        enumeration: MetaPointer,
        literal: String,
    },

    /// Link values violate type or cardinality
    #[error("node '{node}': invalid value for link '{feature}': {reason}")]
    InvalidLinkValue {
        node: String,
        feature: String,
        reason: String,
    },

    /// Child id not found
    #[error("node '{node}': child '{child}' of '{feature}' not found")]
    UnresolvableChild {
        node: String,
        feature: String,
        child: String,
    },

    /// Reference target id not found
    #[error("node '{node}': target '{target}' of '{feature}' not found")]
    UnresolvableReferenceTarget {
        node: String,
        feature: String,
        target: String,
    },

    /// Annotation id not found
    #[error("node '{node}': annotation '{annotation}' not found")]
    UnresolvableAnnotation { node: String, annotation: String },

    /// Declared parent id not found
    #[error("node '{node}': parent '{parent}' not found")]
    UnresolvableParent { node: String, parent: String },

    /// Containment edge would close a loop
    #[error("containing '{child}' in '{parent}' would create a cycle")]
    CircularContainment { parent: String, child: String },

    /// Node listed under a second parent
    #[error("node '{child}' is contained by '{existing_parent}' and listed again by '{new_parent}'")]
    DuplicateContainment {
        child: String,
        existing_parent: String,
        new_parent: String,
    },

    /// Id shared by two records
    #[error("node id '{id}' is used more than once")]
    DuplicateNodeId { id: String },

    /// Annotation does not fit its host
    #[error("node '{node}' cannot carry annotation '{annotation}'")]
    InvalidAnnotation { node: String, annotation: String },

    /// Chunk record repeats a dependent node
    #[error("chunk repeats dependent node '{id}'")]
    SkipDeserializingDependentNode { id: String },
}

impl Anomaly {
    /// Category of the anomaly
    #[must_use]
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Self::UnknownClassifier { .. } => AnomalyKind::UnknownClassifier,
            Self::UnknownFeature { .. } => AnomalyKind::UnknownFeature,
            Self::InvalidFeature { .. } => AnomalyKind::InvalidFeature,
            Self::InvalidPropertyValue { .. } => AnomalyKind::InvalidPropertyValue,
            Self::UnknownDatatype { .. } => AnomalyKind::UnknownDatatype,
            Self::UnknownEnumerationLiteral { .. } => AnomalyKind::UnknownEnumerationLiteral,
            Self::InvalidLinkValue { .. } => AnomalyKind::InvalidLinkValue,
            Self::UnresolvableChild { .. } => AnomalyKind::UnresolvableChild,
            Self::UnresolvableReferenceTarget { .. } => AnomalyKind::UnresolvableReferenceTarget,
            Self::UnresolvableAnnotation { .. } => AnomalyKind::UnresolvableAnnotation,
            Self::UnresolvableParent { .. } => AnomalyKind::UnresolvableParent,
            Self::CircularContainment { .. } => AnomalyKind::CircularContainment,
            Self::DuplicateContainment { .. } => AnomalyKind::DuplicateContainment,
            Self::DuplicateNodeId { .. } => AnomalyKind::DuplicateNodeId,
            Self::InvalidAnnotation { .. } => AnomalyKind::InvalidAnnotation,
            Self::SkipDeserializingDependentNode { .. } => {
                AnomalyKind::SkipDeserializingDependentNode
            }
        }
    }
}

/// What the run did about an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The offending node, value or link was left out
    Dropped,
    /// A validated substitute was used
    Healed,
    /// The node stayed with its first parent
    KeptExisting,
    /// The node moved to the new parent
    Moved,
    /// The dependent node was kept and the chunk record skipped
    UsedDependent,
    /// The chunk record was deserialized and shadows the dependent node
    Deserialized,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dropped => "dropped",
            Self::Healed => "healed",
            Self::KeptExisting => "kept existing parent",
            Self::Moved => "moved",
            Self::UsedDependent => "used dependent node",
            Self::Deserialized => "deserialized chunk record",
        };
        f.write_str(s)
    }
}
