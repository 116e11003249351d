//! Second pass: containments, references and annotations
//!
//! Runs over the records in chunk order once every node exists, so forward
//! references resolve like backward ones.

use super::Resolution;
use crate::anomaly::{Anomaly, Outcome};
use crate::error::DeserializationResult;
use crate::graph::{NodeRef, ReferenceValue, Slot};
use crate::handler::LinkValues;
use lionweb_chunk::{ReferenceTarget, SerializedChunk, SerializedContainment, SerializedReference};
use indexmap::IndexMap;
use lionweb_meta::{Feature, FeatureKind, Metamodel};
use std::sync::Arc;
use tracing::trace;

/// Where an attached node goes
#[derive(Debug, Clone, Copy)]
enum Edge<'f> {
    Containment(&'f Feature),
    Annotation,
}

impl Edge<'_> {
    fn slot(self) -> Slot {
        match self {
            Self::Containment(feature) => Slot::Containment(feature.key().to_string()),
            Self::Annotation => Slot::Annotation,
        }
    }
}

impl<M: Metamodel + ?Sized> Resolution<'_, M> {
    pub(super) fn link(&mut self, chunk: &SerializedChunk) -> DeserializationResult<()> {
        for (index, record) in chunk.nodes.iter().enumerate() {
            let Some(node) = self.created[index] else {
                continue;
            };

            let mut children: IndexMap<String, (Arc<Feature>, Vec<NodeRef>)> = IndexMap::new();
            for containment in &record.containments {
                if let Some((feature, found)) = self.collect_children(node, containment)? {
                    children
                        .entry(feature.key().to_string())
                        .or_insert_with(|| (feature, Vec::new()))
                        .1
                        .extend(found);
                }
            }
            for (feature, found) in children.into_values() {
                self.place_children(node, &feature, found)?;
            }

            let mut targets: IndexMap<String, (Arc<Feature>, Vec<ReferenceValue>)> =
                IndexMap::new();
            for reference in &record.references {
                if let Some((feature, found)) = self.collect_targets(node, reference)? {
                    targets
                        .entry(feature.key().to_string())
                        .or_insert_with(|| (feature, Vec::new()))
                        .1
                        .extend(found);
                }
            }
            for (feature, found) in targets.into_values() {
                self.place_targets(node, &feature, found)?;
            }

            for annotation in &record.annotations {
                self.resolve_annotation(node, annotation)?;
            }
        }
        Ok(())
    }

    /// Resolved children of one containment entry
    ///
    /// Entries naming the same feature are merged before any check, so a
    /// single-valued feature split over several entries is still caught.
    fn collect_children(
        &mut self,
        node: NodeRef,
        containment: &SerializedContainment,
    ) -> DeserializationResult<Option<(Arc<Feature>, Vec<NodeRef>)>> {
        let Some(feature) =
            self.resolve_feature(node, &containment.containment, FeatureKind::Containment)?
        else {
            return Ok(None);
        };

        let mut children = Vec::with_capacity(containment.children.len());
        for child_id in &containment.children {
            match self.graph.lookup(child_id) {
                Some(child) => children.push(child),
                None => children.extend(self.heal_child(node, &feature, child_id)?),
            }
        }
        Ok(Some((feature, children)))
    }

    fn place_children(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        children: Vec<NodeRef>,
    ) -> DeserializationResult<()> {
        let Some(children) = self.check_children(node, feature, children)? else {
            return Ok(());
        };
        for child in children {
            self.attach(node, Edge::Containment(feature), child)?;
        }
        Ok(())
    }

    fn heal_child(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        child_id: &str,
    ) -> DeserializationResult<Option<NodeRef>> {
        let anomaly = Anomaly::UnresolvableChild {
            node: self.id_of(node),
            feature: feature.key().to_string(),
            child: child_id.to_string(),
        };
        let answer = self
            .handler
            .unresolvable_child(&mut self.graph, node, feature, child_id);
        let Some(child) = Self::decide(&anomaly, answer)? else {
            self.note(anomaly, Outcome::Dropped);
            return Ok(None);
        };
        self.known_node(&anomaly, child)?;
        if !self.conforms(child, feature) {
            return Err(Self::invalid_substitute(
                anomaly,
                format!("'{}'", self.id_of(child)),
                format!("it does not conform to {}", feature.ty()),
            ));
        }
        self.note(anomaly, Outcome::Healed);
        Ok(Some(child))
    }

    fn check_children(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        children: Vec<NodeRef>,
    ) -> DeserializationResult<Option<Vec<NodeRef>>> {
        let Some(reason) = self.link_violation(feature, &children) else {
            return Ok(Some(children));
        };
        let anomaly = Anomaly::InvalidLinkValue {
            node: self.id_of(node),
            feature: feature.key().to_string(),
            reason,
        };
        let values = LinkValues::Children(children);
        let answer = self
            .handler
            .invalid_link_value(&self.graph, node, feature, &values);
        match Self::decide(&anomaly, answer)? {
            None => {
                self.note(anomaly, Outcome::Dropped);
                Ok(None)
            }
            Some(LinkValues::Children(children)) => {
                if let Some(reason) = self.link_violation(feature, &children) {
                    return Err(Self::invalid_substitute(
                        anomaly,
                        format!("{} children", children.len()),
                        reason,
                    ));
                }
                self.note(anomaly, Outcome::Healed);
                Ok(Some(children))
            }
            Some(LinkValues::Targets(_)) => Err(Self::invalid_substitute(
                anomaly,
                "reference entries",
                "a containment holds child nodes",
            )),
        }
    }

    fn collect_targets(
        &mut self,
        node: NodeRef,
        reference: &SerializedReference,
    ) -> DeserializationResult<Option<(Arc<Feature>, Vec<ReferenceValue>)>> {
        let Some(feature) =
            self.resolve_feature(node, &reference.reference, FeatureKind::Reference)?
        else {
            return Ok(None);
        };

        let mut values = Vec::with_capacity(reference.targets.len());
        for entry in &reference.targets {
            let Some(target_id) = entry.reference.as_deref() else {
                match &entry.resolve_info {
                    Some(info) => values.push(ReferenceValue::unresolved(info.clone())),
                    None => trace!("Skipping empty entry of '{}'", feature.key()),
                }
                continue;
            };
            let target = match self.graph.lookup(target_id) {
                Some(target) => Some(target),
                None => self.heal_target(node, &feature, entry)?,
            };
            if let Some(target) = target {
                values.push(ReferenceValue {
                    target: Some(target),
                    resolve_info: entry.resolve_info.clone(),
                });
            }
        }
        Ok(Some((feature, values)))
    }

    fn place_targets(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        values: Vec<ReferenceValue>,
    ) -> DeserializationResult<()> {
        let Some(values) = self.check_targets(node, feature, values)? else {
            return Ok(());
        };
        if !values.is_empty() {
            self.graph.push_references(node, feature.key(), values);
        }
        Ok(())
    }

    fn heal_target(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        entry: &ReferenceTarget,
    ) -> DeserializationResult<Option<NodeRef>> {
        let anomaly = Anomaly::UnresolvableReferenceTarget {
            node: self.id_of(node),
            feature: feature.key().to_string(),
            target: entry.reference.clone().unwrap_or_default(),
        };
        let answer =
            self.handler
                .unresolvable_reference_target(&mut self.graph, node, feature, entry);
        let Some(target) = Self::decide(&anomaly, answer)? else {
            self.note(anomaly, Outcome::Dropped);
            return Ok(None);
        };
        self.known_node(&anomaly, target)?;
        if !self.conforms(target, feature) {
            return Err(Self::invalid_substitute(
                anomaly,
                format!("'{}'", self.id_of(target)),
                format!("it does not conform to {}", feature.ty()),
            ));
        }
        self.note(anomaly, Outcome::Healed);
        Ok(Some(target))
    }

    fn check_targets(
        &mut self,
        node: NodeRef,
        feature: &Feature,
        values: Vec<ReferenceValue>,
    ) -> DeserializationResult<Option<Vec<ReferenceValue>>> {
        let Some(reason) = self.reference_violation(feature, &values) else {
            return Ok(Some(values));
        };
        let anomaly = Anomaly::InvalidLinkValue {
            node: self.id_of(node),
            feature: feature.key().to_string(),
            reason,
        };
        let values = LinkValues::Targets(values);
        let answer = self
            .handler
            .invalid_link_value(&self.graph, node, feature, &values);
        match Self::decide(&anomaly, answer)? {
            None => {
                self.note(anomaly, Outcome::Dropped);
                Ok(None)
            }
            Some(LinkValues::Targets(values)) => {
                if let Some(reason) = self.reference_violation(feature, &values) {
                    return Err(Self::invalid_substitute(
                        anomaly,
                        format!("{} entries", values.len()),
                        reason,
                    ));
                }
                self.note(anomaly, Outcome::Healed);
                Ok(Some(values))
            }
            Some(LinkValues::Children(_)) => Err(Self::invalid_substitute(
                anomaly,
                "child nodes",
                "a reference holds target entries",
            )),
        }
    }

    fn reference_violation(&self, feature: &Feature, values: &[ReferenceValue]) -> Option<String> {
        if let Some(empty) = values
            .iter()
            .find(|v| v.target.is_none() && v.resolve_info.is_none())
        {
            return Some(format!("entry {empty:?} has neither target nor resolve info"));
        }
        let targets: Vec<NodeRef> = values.iter().filter_map(|v| v.target).collect();
        if !feature.is_multiple() && values.len() > 1 {
            return Some(format!("single-valued link holds {} values", values.len()));
        }
        self.link_violation(feature, &targets)
    }

    fn resolve_annotation(&mut self, host: NodeRef, annotation_id: &str) -> DeserializationResult<()> {
        let annotation = match self.graph.lookup(annotation_id) {
            Some(annotation) => annotation,
            None => {
                let anomaly = Anomaly::UnresolvableAnnotation {
                    node: self.id_of(host),
                    annotation: annotation_id.to_string(),
                };
                let answer =
                    self.handler
                        .unresolvable_annotation(&mut self.graph, host, annotation_id);
                let Some(annotation) = Self::decide(&anomaly, answer)? else {
                    self.note(anomaly, Outcome::Dropped);
                    return Ok(());
                };
                self.check_substitute_edge(&anomaly, host, Edge::Annotation, annotation)?;
                self.note(anomaly, Outcome::Healed);
                annotation
            }
        };

        let annotation = if self.edge_violation(host, Edge::Annotation, annotation).is_some() {
            let anomaly = Anomaly::InvalidAnnotation {
                node: self.id_of(host),
                annotation: self.id_of(annotation),
            };
            let answer = self
                .handler
                .invalid_annotation(&self.graph, host, annotation);
            let Some(substitute) = Self::decide(&anomaly, answer)? else {
                self.note(anomaly, Outcome::Dropped);
                return Ok(());
            };
            self.check_substitute_edge(&anomaly, host, Edge::Annotation, substitute)?;
            self.note(anomaly, Outcome::Healed);
            substitute
        } else {
            annotation
        };

        self.attach(host, Edge::Annotation, annotation)
    }

    /// Place `child` under `parent`, handling cycles and second parents
    fn attach(
        &mut self,
        parent: NodeRef,
        edge: Edge<'_>,
        child: NodeRef,
    ) -> DeserializationResult<()> {
        let mut child = child;
        if self.graph.would_create_cycle(parent, child) {
            let anomaly = Anomaly::CircularContainment {
                parent: self.id_of(parent),
                child: self.id_of(child),
            };
            let answer = self
                .handler
                .circular_containment(&mut self.graph, child, parent);
            let Some(substitute) = Self::decide(&anomaly, answer)? else {
                self.note(anomaly, Outcome::Dropped);
                return Ok(());
            };
            self.known_node(&anomaly, substitute)?;
            if self.graph.would_create_cycle(parent, substitute) {
                return Err(Self::invalid_substitute(
                    anomaly,
                    format!("'{}'", self.id_of(substitute)),
                    "attaching it still creates a containment cycle",
                ));
            }
            self.check_substitute_edge(&anomaly, parent, edge, substitute)?;
            self.note(anomaly, Outcome::Healed);
            child = substitute;
        }

        let slot = edge.slot();
        if self.graph.holds(parent, &slot, child) {
            trace!("'{}' listed twice in {slot}", self.id_of(child));
            return Ok(());
        }
        if let Some(existing) = self.graph[child].parent() {
            if existing == parent {
                trace!(
                    "'{}' already held by '{}' in another slot",
                    self.id_of(child),
                    self.id_of(parent)
                );
                return Ok(());
            }
            let anomaly = Anomaly::DuplicateContainment {
                child: self.id_of(child),
                existing_parent: self.id_of(existing),
                new_parent: self.id_of(parent),
            };
            let answer = self
                .handler
                .duplicate_containment(&self.graph, child, existing, parent);
            if !Self::decide(&anomaly, answer)? {
                self.note(anomaly, Outcome::KeptExisting);
                return Ok(());
            }
            self.note(anomaly, Outcome::Moved);
            self.graph.detach(child);
        }
        self.graph.link(parent, slot, child);
        Ok(())
    }

    fn conforms(&self, node: NodeRef, feature: &Feature) -> bool {
        self.metamodel
            .conforms_to(self.graph[node].classifier(), feature.ty())
    }

    /// First type or cardinality problem of a link's nodes
    fn link_violation(&self, feature: &Feature, nodes: &[NodeRef]) -> Option<String> {
        if !feature.is_multiple() && nodes.len() > 1 {
            return Some(format!("single-valued link holds {} values", nodes.len()));
        }
        nodes.iter().find_map(|&n| {
            if !self.graph.contains(n) {
                Some(format!("{n} is not part of the graph"))
            } else if !self.conforms(n, feature) {
                Some(format!(
                    "'{}' is a {}, expected {}",
                    self.id_of(n),
                    self.graph[n].classifier().pointer(),
                    feature.ty()
                ))
            } else {
                None
            }
        })
    }

    fn edge_violation(&self, parent: NodeRef, edge: Edge<'_>, node: NodeRef) -> Option<String> {
        let classifier = self.graph[node].classifier();
        match edge {
            Edge::Containment(feature) => (!self.conforms(node, feature))
                .then(|| format!("it does not conform to {}", feature.ty())),
            Edge::Annotation => (!self
                .metamodel
                .is_valid_annotation_target(classifier, self.graph[parent].classifier()))
            .then(|| format!("{} cannot annotate its host", classifier.pointer())),
        }
    }

    fn check_substitute_edge(
        &self,
        anomaly: &Anomaly,
        parent: NodeRef,
        edge: Edge<'_>,
        node: NodeRef,
    ) -> DeserializationResult<()> {
        self.known_node(anomaly, node)?;
        match self.edge_violation(parent, edge, node) {
            Some(reason) => Err(Self::invalid_substitute(
                anomaly.clone(),
                format!("'{}'", self.id_of(node)),
                reason,
            )),
            None => Ok(()),
        }
    }
}
