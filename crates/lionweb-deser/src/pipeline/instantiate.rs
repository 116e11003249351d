//! First pass: one node per record
//!
//! Ids are normalized and checked for collisions, classifiers looked up and
//! properties parsed. Links are left for the second pass.

use super::Resolution;
use crate::anomaly::{Anomaly, Outcome};
use crate::error::{DeserializationError, DeserializationResult};
use crate::graph::{Node, NodeOrigin, NodeRef};
use crate::handler::Healing;
use lionweb_chunk::{SerializedChunk, SerializedNode, SerializedProperty};
use lionweb_meta::{
    Classifier, DataType, Enumeration, Feature, FeatureKind, MetaPointer, Metamodel,
    PropertyValue, ValueError,
};
use std::sync::Arc;
use tracing::{trace, warn};

impl<M: Metamodel + ?Sized> Resolution<'_, M> {
    pub(super) fn instantiate(&mut self, chunk: &SerializedChunk) -> DeserializationResult<()> {
        for record in &chunk.nodes {
            let node = self.instantiate_record(record)?;
            if node.is_none() {
                self.report.records_skipped += 1;
            }
            self.created.push(node);
        }
        trace!("Instantiated {} nodes", self.report.nodes_created);
        Ok(())
    }

    fn instantiate_record(
        &mut self,
        record: &SerializedNode,
    ) -> DeserializationResult<Option<NodeRef>> {
        let id_mode = self.graph.id_mode();
        let id = id_mode.node_id(&record.id);

        if self.graph.dependent_node(&id).is_some() {
            let anomaly = Anomaly::SkipDeserializingDependentNode {
                id: record.id.clone(),
            };
            let answer = self.handler.skip_deserializing_dependent_node(&record.id);
            if Self::decide(&anomaly, answer)? {
                self.note(anomaly, Outcome::UsedDependent);
                return Ok(None);
            }
            self.note(anomaly, Outcome::Deserialized);
        }

        let classifier = match self.metamodel.classifier(&record.classifier) {
            Some(classifier) => classifier,
            None => {
                let anomaly = Anomaly::UnknownClassifier {
                    node: record.id.clone(),
                    classifier: record.classifier.clone(),
                };
                let answer = self.handler.unknown_classifier(record);
                let Some(classifier) = Self::decide(&anomaly, answer)? else {
                    self.note(anomaly, Outcome::Dropped);
                    return Ok(None);
                };
                self.note(anomaly, Outcome::Healed);
                classifier
            }
        };

        let mut node = Node::new(id, classifier, NodeOrigin::Chunk);
        node.set_declared_parent(record.parent.clone());

        let mut attempts = 0;
        while let Some(existing) = self.graph.chunk_node(node.id()) {
            if attempts == self.config.max_duplicate_id_retries {
                warn!(
                    "Giving up on record '{}' after {attempts} renaming attempts",
                    record.id
                );
                return Err(DeserializationError::DuplicateIdRetriesExhausted {
                    id: record.id.clone(),
                    attempts,
                });
            }
            attempts += 1;

            let anomaly = Anomaly::DuplicateNodeId {
                id: node.id().to_string(),
            };
            let answer = self.handler.duplicate_node_id(&self.graph, existing, &node);
            let Some(renamed) = Self::decide(&anomaly, answer)? else {
                self.note(anomaly, Outcome::Dropped);
                return Ok(None);
            };
            self.note(anomaly, Outcome::Healed);
            node.set_id(id_mode.node_id(&renamed));
        }

        let node_ref = self.graph.insert(node);
        self.report.nodes_created += 1;
        for property in &record.properties {
            self.resolve_property(node_ref, property)?;
        }
        Ok(Some(node_ref))
    }

    /// Feature of `node`'s classifier matching `pointer` and of kind `expected`
    pub(super) fn resolve_feature(
        &mut self,
        node: NodeRef,
        pointer: &MetaPointer,
        expected: FeatureKind,
    ) -> DeserializationResult<Option<Arc<Feature>>> {
        let classifier = Arc::clone(self.graph[node].classifier());
        match self.metamodel.feature(&classifier, &pointer.key) {
            Some(feature) if feature.kind() == expected => Ok(Some(feature)),
            Some(feature) => {
                let anomaly = Anomaly::InvalidFeature {
                    node: self.id_of(node),
                    feature: feature.key().to_string(),
                    expected,
                    actual: feature.kind(),
                };
                let answer = self
                    .handler
                    .invalid_feature(&self.graph, node, &feature, expected);
                self.heal_feature(anomaly, answer, &classifier, expected)
            }
            None => {
                let anomaly = Anomaly::UnknownFeature {
                    node: self.id_of(node),
                    feature: pointer.clone(),
                    kind: expected,
                };
                let answer = self
                    .handler
                    .unknown_feature(&self.graph, node, pointer, expected);
                self.heal_feature(anomaly, answer, &classifier, expected)
            }
        }
    }

    fn heal_feature(
        &mut self,
        anomaly: Anomaly,
        answer: Healing<Arc<Feature>>,
        classifier: &Classifier,
        expected: FeatureKind,
    ) -> DeserializationResult<Option<Arc<Feature>>> {
        let Some(substitute) = Self::decide(&anomaly, answer)? else {
            self.note(anomaly, Outcome::Dropped);
            return Ok(None);
        };
        let name = format!("feature '{}'", substitute.key());
        if substitute.kind() != expected {
            return Err(Self::invalid_substitute(
                anomaly,
                name,
                format!("it is a {}, expected a {expected}", substitute.kind()),
            ));
        }
        let declared = self
            .metamodel
            .feature(classifier, substitute.key())
            .is_some_and(|f| *f == *substitute);
        if !declared {
            return Err(Self::invalid_substitute(
                anomaly,
                name,
                format!("{} does not declare it", classifier.pointer()),
            ));
        }
        self.note(anomaly, Outcome::Healed);
        Ok(Some(substitute))
    }

    fn resolve_property(
        &mut self,
        node: NodeRef,
        property: &SerializedProperty,
    ) -> DeserializationResult<()> {
        let Some(feature) =
            self.resolve_feature(node, &property.property, FeatureKind::Property)?
        else {
            return Ok(());
        };
        // null leaves the property unset
        let Some(raw) = property.value.as_deref() else {
            return Ok(());
        };
        if let Some(value) = self.parse_value(node, &feature, raw)? {
            self.graph.put_property(node, feature.key(), value);
        }
        Ok(())
    }

    fn parse_value(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        raw: &str,
    ) -> DeserializationResult<Option<PropertyValue>> {
        let Some(datatype) = self.metamodel.datatype(feature.ty()) else {
            let anomaly = Anomaly::UnknownDatatype {
                node: self.id_of(node),
                feature: feature.key().to_string(),
                datatype: feature.ty().clone(),
            };
            let answer = self
                .handler
                .unknown_datatype(&self.graph, node, feature, raw);
            let value = Self::decide(&anomaly, answer)?;
            let outcome = if value.is_some() {
                Outcome::Healed
            } else {
                Outcome::Dropped
            };
            self.note(anomaly, outcome);
            return Ok(value);
        };

        let parsed = match &datatype {
            DataType::Enumeration(enumeration) => {
                return self.parse_literal(node, feature, enumeration, raw);
            }
            DataType::Primitive(primitive) => self.metamodel.parse(primitive, raw),
            DataType::Structured(structured) => self.metamodel.parse_structured(structured, raw),
        };
        match parsed {
            Ok(value) => Ok(Some(value)),
            Err(error) => self.heal_value(node, feature, &datatype, raw, &error),
        }
    }

    fn parse_literal(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        enumeration: &Enumeration,
        raw: &str,
    ) -> DeserializationResult<Option<PropertyValue>> {
        if let Some(literal) = self.metamodel.enumeration_literal(enumeration, raw) {
            return Ok(Some(PropertyValue::Enum(literal)));
        }
        let anomaly = Anomaly::UnknownEnumerationLiteral {
            node: self.id_of(node),
            feature: feature.key().to_string(),
            enumeration: enumeration.pointer().clone(),
            literal: raw.to_string(),
        };
        let answer = self
            .handler
            .unknown_enumeration_literal(&self.graph, node, feature, enumeration, raw);
        let Some(literal) = Self::decide(&anomaly, answer)? else {
            self.note(anomaly, Outcome::Dropped);
            return Ok(None);
        };
        if !enumeration.owns(&literal) {
            return Err(Self::invalid_substitute(
                anomaly,
                format!("literal '{}'", literal.key),
                format!("it belongs to {}", literal.enumeration),
            ));
        }
        self.note(anomaly, Outcome::Healed);
        Ok(Some(PropertyValue::Enum(literal)))
    }

    fn heal_value(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        datatype: &DataType,
        raw: &str,
        error: &ValueError,
    ) -> DeserializationResult<Option<PropertyValue>> {
        let anomaly = Anomaly::InvalidPropertyValue {
            node: self.id_of(node),
            feature: feature.key().to_string(),
            raw: raw.to_string(),
            reason: error.to_string(),
        };
        let answer = self
            .handler
            .invalid_property_value(&self.graph, node, feature, raw, error);
        let Some(value) = Self::decide(&anomaly, answer)? else {
            self.note(anomaly, Outcome::Dropped);
            return Ok(None);
        };
        if !self.metamodel.accepts(datatype, &value) {
            return Err(Self::invalid_substitute(
                anomaly,
                &value,
                format!("it is not a valid {}", datatype.pointer()),
            ));
        }
        self.note(anomaly, Outcome::Healed);
        Ok(Some(value))
    }
}
