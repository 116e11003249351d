//! Anomaly handler policy
//!
//! The [`AnomalyHandler`] trait is consulted at every decision point of a
//! run. Each method either aborts the run, declines to heal (the offending
//! element is dropped), or returns a substitute the pipeline re-validates
//! before using it.
//!
//! Every method defaults to declining, so an empty `impl` is the ignoring
//! policy. [`StrictHandler`] aborts on everything; [`RecordingHandler`]
//! wraps another handler and remembers which decisions were requested.

use crate::anomaly::AnomalyKind;
use crate::graph::{Node, NodeGraph, NodeRef, ReferenceValue};
use lionweb_chunk::{ReferenceTarget, SerializedNode};
use lionweb_meta::{
    Classifier, EnumLiteral, Enumeration, Feature, FeatureKind, MetaPointer, PropertyValue,
    ValueError,
};
use std::sync::Arc;

/// Refusal to continue a run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct HandlerAbort {
    reason: String,
}

impl HandlerAbort {
    /// Abort with a reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the handler stopped the run
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Handler decision
///
/// - `Err(_)`: abort the run
/// - `Ok(None)`: drop the offending element
/// - `Ok(Some(x))`: use `x` after re-validation
pub type Healing<T> = Result<Option<T>, HandlerAbort>;

/// Values of one link, as handed to [`AnomalyHandler::invalid_link_value`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkValues {
    /// Children of a containment
    Children(Vec<NodeRef>),
    /// Entries of a reference
    Targets(Vec<ReferenceValue>),
}

impl LinkValues {
    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Children(c) => c.len(),
            Self::Targets(t) => t.len(),
        }
    }

    /// Whether there are no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Policy for every anomaly a run can hit
///
/// Graph arguments reflect the run's current state. Methods that receive
/// `&mut NodeGraph` may create or detach nodes before answering.
#[allow(unused_variables)]
pub trait AnomalyHandler {
    /// Record names a classifier the metamodel does not know
    ///
    /// A substitute is used as-is.
    fn unknown_classifier(&mut self, node: &SerializedNode) -> Healing<Arc<Classifier>> {
        Ok(None)
    }

    /// A second record uses an id already taken by `existing`
    ///
    /// A substitute id is re-checked for collisions; the run gives up after
    /// the configured number of attempts.
    fn duplicate_node_id(
        &mut self,
        graph: &NodeGraph,
        existing: NodeRef,
        node: &Node,
    ) -> Healing<String> {
        Ok(None)
    }

    /// Node's classifier has no feature with this key
    fn unknown_feature(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &MetaPointer,
        kind: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        Ok(None)
    }

    /// Feature exists but is not of the `expected` kind
    fn invalid_feature(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Arc<Feature>,
        expected: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        Ok(None)
    }

    /// Raw value does not parse against the property's datatype
    fn invalid_property_value(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        raw: &str,
        error: &ValueError,
    ) -> Healing<PropertyValue> {
        Ok(None)
    }

    /// Property's datatype is unknown; a substitute is used as-is
    fn unknown_datatype(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        raw: &str,
    ) -> Healing<PropertyValue> {
        Ok(None)
    }

    /// Enumeration has no literal `literal`
    ///
    /// A substitute must belong to `enumeration`.
    fn unknown_enumeration_literal(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        enumeration: &Enumeration,
        literal: &str,
    ) -> Healing<EnumLiteral> {
        Ok(None)
    }

    /// Link values break the feature's type or cardinality
    fn invalid_link_value(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        values: &LinkValues,
    ) -> Healing<LinkValues> {
        Ok(None)
    }

    /// Child id is neither in the chunk nor a dependent node
    fn unresolvable_child(
        &mut self,
        graph: &mut NodeGraph,
        parent: NodeRef,
        feature: &Feature,
        child: &str,
    ) -> Healing<NodeRef> {
        Ok(None)
    }

    /// Reference target id is neither in the chunk nor a dependent node
    fn unresolvable_reference_target(
        &mut self,
        graph: &mut NodeGraph,
        node: NodeRef,
        feature: &Feature,
        target: &ReferenceTarget,
    ) -> Healing<NodeRef> {
        Ok(None)
    }

    /// Annotation id is neither in the chunk nor a dependent node
    fn unresolvable_annotation(
        &mut self,
        graph: &mut NodeGraph,
        host: NodeRef,
        annotation: &str,
    ) -> Healing<NodeRef> {
        Ok(None)
    }

    /// Declared parent id is neither in the chunk nor a dependent node
    fn unresolvable_parent(
        &mut self,
        graph: &mut NodeGraph,
        node: NodeRef,
        parent: &str,
    ) -> Healing<NodeRef> {
        Ok(None)
    }

    /// Placing `child` under `parent` would close a loop
    ///
    /// The handler may restructure `graph`; the returned node is attached
    /// instead of `child` and must not recreate the loop.
    fn circular_containment(
        &mut self,
        graph: &mut NodeGraph,
        child: NodeRef,
        parent: NodeRef,
    ) -> Healing<NodeRef> {
        Ok(None)
    }

    /// `child` is already contained by `existing_parent`
    ///
    /// `true` moves it under `new_parent`, `false` keeps the first parent.
    fn duplicate_containment(
        &mut self,
        graph: &NodeGraph,
        child: NodeRef,
        existing_parent: NodeRef,
        new_parent: NodeRef,
    ) -> Result<bool, HandlerAbort> {
        Ok(false)
    }

    /// `annotation` cannot annotate `host`
    fn invalid_annotation(
        &mut self,
        graph: &NodeGraph,
        host: NodeRef,
        annotation: NodeRef,
    ) -> Healing<NodeRef> {
        Ok(None)
    }

    /// Chunk contains a record for dependent node `id`
    ///
    /// `true` keeps the dependent node and skips the record.
    fn skip_deserializing_dependent_node(&mut self, id: &str) -> Result<bool, HandlerAbort> {
        Ok(true)
    }
}

/// Drops everything it cannot trust and keeps going
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoringHandler;

impl AnomalyHandler for IgnoringHandler {}

/// Aborts the run on the first anomaly
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictHandler;

impl StrictHandler {
    fn reject<T>(kind: AnomalyKind) -> Result<T, HandlerAbort> {
        Err(HandlerAbort::new(format!("strict policy rejects {kind}")))
    }
}

impl AnomalyHandler for StrictHandler {
    fn unknown_classifier(&mut self, _: &SerializedNode) -> Healing<Arc<Classifier>> {
        Self::reject(AnomalyKind::UnknownClassifier)
    }

    fn duplicate_node_id(&mut self, _: &NodeGraph, _: NodeRef, _: &Node) -> Healing<String> {
        Self::reject(AnomalyKind::DuplicateNodeId)
    }

    fn unknown_feature(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &MetaPointer,
        _: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        Self::reject(AnomalyKind::UnknownFeature)
    }

    fn invalid_feature(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Arc<Feature>,
        _: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        Self::reject(AnomalyKind::InvalidFeature)
    }

    fn invalid_property_value(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &str,
        _: &ValueError,
    ) -> Healing<PropertyValue> {
        Self::reject(AnomalyKind::InvalidPropertyValue)
    }

    fn unknown_datatype(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &str,
    ) -> Healing<PropertyValue> {
        Self::reject(AnomalyKind::UnknownDatatype)
    }

    fn unknown_enumeration_literal(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &Enumeration,
        _: &str,
    ) -> Healing<EnumLiteral> {
        Self::reject(AnomalyKind::UnknownEnumerationLiteral)
    }

    fn invalid_link_value(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &LinkValues,
    ) -> Healing<LinkValues> {
        Self::reject(AnomalyKind::InvalidLinkValue)
    }

    fn unresolvable_child(
        &mut self,
        _: &mut NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &str,
    ) -> Healing<NodeRef> {
        Self::reject(AnomalyKind::UnresolvableChild)
    }

    fn unresolvable_reference_target(
        &mut self,
        _: &mut NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &ReferenceTarget,
    ) -> Healing<NodeRef> {
        Self::reject(AnomalyKind::UnresolvableReferenceTarget)
    }

    fn unresolvable_annotation(
        &mut self,
        _: &mut NodeGraph,
        _: NodeRef,
        _: &str,
    ) -> Healing<NodeRef> {
        Self::reject(AnomalyKind::UnresolvableAnnotation)
    }

    fn unresolvable_parent(&mut self, _: &mut NodeGraph, _: NodeRef, _: &str) -> Healing<NodeRef> {
        Self::reject(AnomalyKind::UnresolvableParent)
    }

    fn circular_containment(
        &mut self,
        _: &mut NodeGraph,
        _: NodeRef,
        _: NodeRef,
    ) -> Healing<NodeRef> {
        Self::reject(AnomalyKind::CircularContainment)
    }

    fn duplicate_containment(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: NodeRef,
        _: NodeRef,
    ) -> Result<bool, HandlerAbort> {
        Self::reject(AnomalyKind::DuplicateContainment)
    }

    fn invalid_annotation(&mut self, _: &NodeGraph, _: NodeRef, _: NodeRef) -> Healing<NodeRef> {
        Self::reject(AnomalyKind::InvalidAnnotation)
    }
}

/// Delegates to `H` and records every consultation in order
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler<H = IgnoringHandler> {
    inner: H,
    seen: Vec<AnomalyKind>,
}

impl<H: AnomalyHandler> RecordingHandler<H> {
    /// Wrap a handler
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            seen: Vec::new(),
        }
    }

    /// Consultations so far
    #[must_use]
    pub fn seen(&self) -> &[AnomalyKind] {
        &self.seen
    }

    /// How often `kind` was consulted
    #[must_use]
    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.seen.iter().filter(|k| **k == kind).count()
    }

    /// Wrapped handler
    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    /// Unwrap
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: AnomalyHandler> AnomalyHandler for RecordingHandler<H> {
    fn unknown_classifier(&mut self, node: &SerializedNode) -> Healing<Arc<Classifier>> {
        self.seen.push(AnomalyKind::UnknownClassifier);
        self.inner.unknown_classifier(node)
    }

    fn duplicate_node_id(
        &mut self,
        graph: &NodeGraph,
        existing: NodeRef,
        node: &Node,
    ) -> Healing<String> {
        self.seen.push(AnomalyKind::DuplicateNodeId);
        self.inner.duplicate_node_id(graph, existing, node)
    }

    fn unknown_feature(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &MetaPointer,
        kind: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        self.seen.push(AnomalyKind::UnknownFeature);
        self.inner.unknown_feature(graph, node, feature, kind)
    }

    fn invalid_feature(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Arc<Feature>,
        expected: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        self.seen.push(AnomalyKind::InvalidFeature);
        self.inner.invalid_feature(graph, node, feature, expected)
    }

    fn invalid_property_value(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        raw: &str,
        error: &ValueError,
    ) -> Healing<PropertyValue> {
        self.seen.push(AnomalyKind::InvalidPropertyValue);
        self.inner
            .invalid_property_value(graph, node, feature, raw, error)
    }

    fn unknown_datatype(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        raw: &str,
    ) -> Healing<PropertyValue> {
        self.seen.push(AnomalyKind::UnknownDatatype);
        self.inner.unknown_datatype(graph, node, feature, raw)
    }

    fn unknown_enumeration_literal(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        enumeration: &Enumeration,
        literal: &str,
    ) -> Healing<EnumLiteral> {
        self.seen.push(AnomalyKind::UnknownEnumerationLiteral);
        self.inner
            .unknown_enumeration_literal(graph, node, feature, enumeration, literal)
    }

    fn invalid_link_value(
        &mut self,
        graph: &NodeGraph,
        node: NodeRef,
        feature: &Feature,
        values: &LinkValues,
    ) -> Healing<LinkValues> {
        self.seen.push(AnomalyKind::InvalidLinkValue);
        self.inner.invalid_link_value(graph, node, feature, values)
    }

    fn unresolvable_child(
        &mut self,
        graph: &mut NodeGraph,
        parent: NodeRef,
        feature: &Feature,
        child: &str,
    ) -> Healing<NodeRef> {
        self.seen.push(AnomalyKind::UnresolvableChild);
        self.inner.unresolvable_child(graph, parent, feature, child)
    }

    fn unresolvable_reference_target(
        &mut self,
        graph: &mut NodeGraph,
        node: NodeRef,
        feature: &Feature,
        target: &ReferenceTarget,
    ) -> Healing<NodeRef> {
        self.seen.push(AnomalyKind::UnresolvableReferenceTarget);
        self.inner
            .unresolvable_reference_target(graph, node, feature, target)
    }

    fn unresolvable_annotation(
        &mut self,
        graph: &mut NodeGraph,
        host: NodeRef,
        annotation: &str,
    ) -> Healing<NodeRef> {
        self.seen.push(AnomalyKind::UnresolvableAnnotation);
        self.inner.unresolvable_annotation(graph, host, annotation)
    }

    fn unresolvable_parent(
        &mut self,
        graph: &mut NodeGraph,
        node: NodeRef,
        parent: &str,
    ) -> Healing<NodeRef> {
        self.seen.push(AnomalyKind::UnresolvableParent);
        self.inner.unresolvable_parent(graph, node, parent)
    }

    fn circular_containment(
        &mut self,
        graph: &mut NodeGraph,
        child: NodeRef,
        parent: NodeRef,
    ) -> Healing<NodeRef> {
        self.seen.push(AnomalyKind::CircularContainment);
        self.inner.circular_containment(graph, child, parent)
    }

    fn duplicate_containment(
        &mut self,
        graph: &NodeGraph,
        child: NodeRef,
        existing_parent: NodeRef,
        new_parent: NodeRef,
    ) -> Result<bool, HandlerAbort> {
        self.seen.push(AnomalyKind::DuplicateContainment);
        self.inner
            .duplicate_containment(graph, child, existing_parent, new_parent)
    }

    fn invalid_annotation(
        &mut self,
        graph: &NodeGraph,
        host: NodeRef,
        annotation: NodeRef,
    ) -> Healing<NodeRef> {
        self.seen.push(AnomalyKind::InvalidAnnotation);
        self.inner.invalid_annotation(graph, host, annotation)
    }

    fn skip_deserializing_dependent_node(&mut self, id: &str) -> Result<bool, HandlerAbort> {
        self.seen.push(AnomalyKind::SkipDeserializingDependentNode);
        self.inner.skip_deserializing_dependent_node(id)
    }
}
