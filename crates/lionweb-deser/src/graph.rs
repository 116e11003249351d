//! Resolved node graph
//!
//! Nodes live in an arena and point at each other through [`NodeRef`]
//! indices. Every structural edit goes through [`NodeGraph`], which keeps
//! the containment tree consistent: a node has at most one parent, the
//! parent's slot lists the node exactly once, and no node contains itself.

use indexmap::IndexMap;
use lionweb_ids::{CompressedId, IdMode, NodeId};
use lionweb_meta::{Classifier, PropertyValue};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::ops::Index;
use std::sync::Arc;

/// Index of a node in a [`NodeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(u32);

impl NodeRef {
    /// Arena position
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOrigin {
    /// Deserialized from the chunk
    Chunk,
    /// Supplied by the caller as an already-known external node
    Dependent,
}

/// Parent-side position of a contained node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Child of the containment with this key
    Containment(String),
    /// Annotation of the parent
    Annotation,
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Containment(key) => write!(f, "containment '{key}'"),
            Self::Annotation => f.write_str("annotations"),
        }
    }
}

/// Link from a node to its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentLink {
    /// Containing node
    pub node: NodeRef,
    /// Slot of the parent holding the child
    pub slot: Slot,
}

/// One reference entry
///
/// At least one of `target` and `resolve_info` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    /// Resolved target node
    pub target: Option<NodeRef>,
    /// Textual hint carried over from the chunk
    pub resolve_info: Option<String>,
}

impl ReferenceValue {
    /// Entry pointing at `target`
    #[must_use]
    pub fn to(target: NodeRef) -> Self {
        Self {
            target: Some(target),
            resolve_info: None,
        }
    }

    /// Entry known only by its resolve hint
    #[must_use]
    pub fn unresolved(resolve_info: impl Into<String>) -> Self {
        Self {
            target: None,
            resolve_info: Some(resolve_info.into()),
        }
    }
}

/// Resolved node
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    classifier: Arc<Classifier>,
    origin: NodeOrigin,
    properties: IndexMap<String, PropertyValue>,
    containments: IndexMap<String, Vec<NodeRef>>,
    references: IndexMap<String, Vec<ReferenceValue>>,
    annotations: Vec<NodeRef>,
    parent: Option<ParentLink>,
    declared_parent: Option<String>,
}

impl Node {
    pub(crate) fn new(id: NodeId, classifier: Arc<Classifier>, origin: NodeOrigin) -> Self {
        Self {
            id,
            classifier,
            origin,
            properties: IndexMap::new(),
            containments: IndexMap::new(),
            references: IndexMap::new(),
            annotations: Vec::new(),
            parent: None,
            declared_parent: None,
        }
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub(crate) fn set_declared_parent(&mut self, parent: Option<String>) {
        self.declared_parent = parent;
    }

    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Classifier the node instantiates
    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// Origin of the node
    #[inline]
    #[must_use]
    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    /// Whether the node was supplied as a dependent node
    #[inline]
    #[must_use]
    pub fn is_dependent(&self) -> bool {
        self.origin == NodeOrigin::Dependent
    }

    /// Value of a property, if set
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Set properties in insertion order
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, PropertyValue> {
        &self.properties
    }

    /// Children of a containment (empty when unset)
    #[must_use]
    pub fn children(&self, key: &str) -> &[NodeRef] {
        self.containments.get(key).map_or(&[], Vec::as_slice)
    }

    /// Every containment with its children
    pub fn containments(&self) -> impl Iterator<Item = (&str, &[NodeRef])> {
        self.containments
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Entries of a reference (empty when unset)
    #[must_use]
    pub fn references(&self, key: &str) -> &[ReferenceValue] {
        self.references.get(key).map_or(&[], Vec::as_slice)
    }

    /// Every reference with its entries
    pub fn all_references(&self) -> impl Iterator<Item = (&str, &[ReferenceValue])> {
        self.references
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Annotations in order
    #[must_use]
    pub fn annotations(&self) -> &[NodeRef] {
        &self.annotations
    }

    /// Containing node
    #[must_use]
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.as_ref().map(|link| link.node)
    }

    /// Containing node and slot
    #[must_use]
    pub fn parent_link(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Parent id the chunk declared for this node
    #[must_use]
    pub fn declared_parent(&self) -> Option<&str> {
        self.declared_parent.as_deref()
    }

    /// Keys of every feature holding a value
    ///
    /// Properties first, then non-empty containments and references.
    #[must_use]
    pub fn set_features(&self) -> Vec<&str> {
        self.properties
            .keys()
            .map(String::as_str)
            .chain(
                self.containments
                    .iter()
                    .filter(|(_, c)| !c.is_empty())
                    .map(|(k, _)| k.as_str()),
            )
            .chain(
                self.references
                    .iter()
                    .filter(|(_, r)| !r.is_empty())
                    .map(|(k, _)| k.as_str()),
            )
            .collect()
    }

    fn slot_mut(&mut self, slot: &Slot) -> &mut Vec<NodeRef> {
        match slot {
            Slot::Containment(key) => self.containments.entry(key.clone()).or_default(),
            Slot::Annotation => &mut self.annotations,
        }
    }

    fn slot(&self, slot: &Slot) -> &[NodeRef] {
        match slot {
            Slot::Containment(key) => self.children(key),
            Slot::Annotation => &self.annotations,
        }
    }
}

/// Structural edit errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Reference does not belong to this graph
    #[error("unknown node {0}")]
    UnknownNode(NodeRef),

    /// Another chunk node already uses the id
    #[error("node id '{0}' is already in use")]
    DuplicateId(String),

    /// A node cannot contain itself
    #[error("node {0} cannot contain itself")]
    SelfContainment(NodeRef),

    /// The child is an ancestor of the parent
    #[error("attaching {child} under {parent} would create a containment cycle")]
    WouldCreateCycle { parent: NodeRef, child: NodeRef },

    /// The child already has a parent
    #[error("node {child} is already contained by {parent}")]
    AlreadyContained { child: NodeRef, parent: NodeRef },

    /// Parent and child links disagree
    #[error("inconsistent containment: {0}")]
    Inconsistent(String),
}

/// Arena of resolved nodes
#[derive(Debug, Clone)]
pub struct NodeGraph {
    id_mode: IdMode,
    nodes: Vec<Node>,
    by_id: HashMap<CompressedId, NodeRef>,
    dependents: HashMap<CompressedId, NodeRef>,
}

impl NodeGraph {
    /// Empty graph normalizing ids with `id_mode`
    #[must_use]
    pub fn new(id_mode: IdMode) -> Self {
        Self {
            id_mode,
            nodes: Vec::new(),
            by_id: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    /// Id normalization in use
    #[inline]
    #[must_use]
    pub fn id_mode(&self) -> IdMode {
        self.id_mode
    }

    /// Number of nodes, dependent nodes included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `node` is in range for this graph
    ///
    /// A [`NodeRef`] carries no graph identity, so a handle taken from
    /// another graph passes whenever its index is in range here. Substitute
    /// checks rely on this, which makes handles from foreign graphs the
    /// caller's responsibility.
    #[inline]
    #[must_use]
    pub fn contains(&self, node: NodeRef) -> bool {
        node.index() < self.nodes.len()
    }

    /// Node by reference
    #[must_use]
    pub fn get(&self, node: NodeRef) -> Option<&Node> {
        self.nodes.get(node.index())
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (to_ref(i), n))
    }

    /// Node with the given textual id; chunk nodes shadow dependent nodes
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<NodeRef> {
        self.lookup_id(&self.id_mode.node_id(id))
    }

    /// Node with the given normalized id
    #[must_use]
    pub fn lookup_id(&self, id: &NodeId) -> Option<NodeRef> {
        let key = id.compressed();
        self.by_id
            .get(key)
            .or_else(|| self.dependents.get(key))
            .copied()
    }

    pub(crate) fn chunk_node(&self, id: &NodeId) -> Option<NodeRef> {
        self.by_id.get(id.compressed()).copied()
    }

    pub(crate) fn dependent_node(&self, id: &NodeId) -> Option<NodeRef> {
        self.dependents.get(id.compressed()).copied()
    }

    /// Create a fresh, parentless chunk node
    ///
    /// # Errors
    /// [`GraphError::DuplicateId`] when a chunk node already uses `id`.
    pub fn create_node(
        &mut self,
        id: &str,
        classifier: Arc<Classifier>,
    ) -> Result<NodeRef, GraphError> {
        let id = self.id_mode.node_id(id);
        if self.chunk_node(&id).is_some() {
            return Err(GraphError::DuplicateId(id.to_string()));
        }
        Ok(self.insert(Node::new(id, classifier, NodeOrigin::Chunk)))
    }

    /// Insert a node whose id is known to be free
    pub(crate) fn insert(&mut self, node: Node) -> NodeRef {
        let node_ref = to_ref(self.nodes.len());
        let table = match node.origin {
            NodeOrigin::Chunk => &mut self.by_id,
            NodeOrigin::Dependent => &mut self.dependents,
        };
        table.insert(node.id.compressed().clone(), node_ref);
        self.nodes.push(node);
        node_ref
    }

    /// Containing nodes from the direct parent up to the root
    pub fn ancestors(&self, node: NodeRef) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            current: self.get(node).and_then(Node::parent),
            remaining: self.nodes.len(),
        }
    }

    /// Whether `candidate` is `node` or one of its ancestors
    #[must_use]
    pub fn is_ancestor_or_self(&self, candidate: NodeRef, node: NodeRef) -> bool {
        candidate == node || self.ancestors(node).any(|a| a == candidate)
    }

    /// Whether placing `child` under `parent` would close a containment loop
    #[must_use]
    pub fn would_create_cycle(&self, parent: NodeRef, child: NodeRef) -> bool {
        self.is_ancestor_or_self(child, parent)
    }

    /// Node and everything it transitively contains, pre-order
    #[must_use]
    pub fn descendants(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let Some(n) = self.get(current) else { continue };
            out.push(current);
            let children: Vec<NodeRef> = n
                .containments
                .values()
                .flatten()
                .chain(n.annotations.iter())
                .copied()
                .collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Chunk nodes without a parent, in insertion order
    #[must_use]
    pub fn roots(&self) -> Vec<NodeRef> {
        self.iter()
            .filter(|(_, n)| n.origin == NodeOrigin::Chunk && n.parent.is_none())
            .map(|(r, _)| r)
            .collect()
    }

    /// Remove `node` from its parent, returning the old link
    pub fn detach(&mut self, node: NodeRef) -> Option<ParentLink> {
        let link = self.nodes.get_mut(node.index())?.parent.take()?;
        self.nodes[link.node.index()]
            .slot_mut(&link.slot)
            .retain(|c| *c != node);
        Some(link)
    }

    /// Append `child` to a containment of `parent`
    ///
    /// # Errors
    /// Fails when either node is unknown, the child already has a parent, or
    /// the edge would make a node its own ancestor.
    pub fn add_child(
        &mut self,
        parent: NodeRef,
        containment: &str,
        child: NodeRef,
    ) -> Result<(), GraphError> {
        self.check_attach(parent, child)?;
        self.link(parent, Slot::Containment(containment.to_string()), child);
        Ok(())
    }

    /// Append `annotation` to the annotations of `host`
    ///
    /// # Errors
    /// Same conditions as [`NodeGraph::add_child`].
    pub fn add_annotation(&mut self, host: NodeRef, annotation: NodeRef) -> Result<(), GraphError> {
        self.check_attach(host, annotation)?;
        self.link(host, Slot::Annotation, annotation);
        Ok(())
    }

    fn check_attach(&self, parent: NodeRef, child: NodeRef) -> Result<(), GraphError> {
        for node in [parent, child] {
            if !self.contains(node) {
                return Err(GraphError::UnknownNode(node));
            }
        }
        if parent == child {
            return Err(GraphError::SelfContainment(child));
        }
        if let Some(existing) = self.nodes[child.index()].parent() {
            return Err(GraphError::AlreadyContained {
                child,
                parent: existing,
            });
        }
        if self.would_create_cycle(parent, child) {
            return Err(GraphError::WouldCreateCycle { parent, child });
        }
        Ok(())
    }

    /// Attach without checks; callers have ruled out cycles and prior parents
    pub(crate) fn link(&mut self, parent: NodeRef, slot: Slot, child: NodeRef) {
        self.nodes[parent.index()].slot_mut(&slot).push(child);
        self.nodes[child.index()].parent = Some(ParentLink { node: parent, slot });
    }

    /// Whether `child` is listed in `slot` of `parent`
    #[must_use]
    pub fn holds(&self, parent: NodeRef, slot: &Slot, child: NodeRef) -> bool {
        self.get(parent)
            .is_some_and(|p| p.slot(slot).contains(&child))
    }

    /// Set or replace a property value
    ///
    /// # Errors
    /// [`GraphError::UnknownNode`] for a foreign reference.
    pub fn set_property(
        &mut self,
        node: NodeRef,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), GraphError> {
        let n = self.get_mut(node)?;
        n.properties.insert(key.to_string(), value);
        Ok(())
    }

    pub(crate) fn put_property(&mut self, node: NodeRef, key: &str, value: PropertyValue) {
        self.nodes[node.index()]
            .properties
            .insert(key.to_string(), value);
    }

    pub(crate) fn push_references(&mut self, node: NodeRef, key: &str, values: Vec<ReferenceValue>) {
        self.nodes[node.index()]
            .references
            .entry(key.to_string())
            .or_default()
            .extend(values);
    }

    /// Unset a property, returning its old value
    pub fn remove_property(&mut self, node: NodeRef, key: &str) -> Option<PropertyValue> {
        self.nodes
            .get_mut(node.index())?
            .properties
            .shift_remove(key)
    }

    /// Append a reference entry
    ///
    /// # Errors
    /// [`GraphError::UnknownNode`] when `node` or the entry's target is foreign.
    pub fn add_reference(
        &mut self,
        node: NodeRef,
        key: &str,
        value: ReferenceValue,
    ) -> Result<(), GraphError> {
        if let Some(target) = value.target {
            if !self.contains(target) {
                return Err(GraphError::UnknownNode(target));
            }
        }
        let n = self.get_mut(node)?;
        n.references.entry(key.to_string()).or_default().push(value);
        Ok(())
    }

    fn get_mut(&mut self, node: NodeRef) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(node.index())
            .ok_or(GraphError::UnknownNode(node))
    }

    /// Check the containment invariants over the whole graph
    ///
    /// # Errors
    /// [`GraphError::Inconsistent`] describing the first violation found.
    pub fn verify_tree(&self) -> Result<(), GraphError> {
        let mut seen: HashMap<NodeRef, NodeRef> = HashMap::new();
        for (parent, node) in self.iter() {
            let slots = node
                .containments
                .iter()
                .map(|(k, c)| (Slot::Containment(k.clone()), c))
                .chain(std::iter::once((Slot::Annotation, &node.annotations)));
            for (slot, children) in slots {
                for &child in children {
                    if let Some(previous) = seen.insert(child, parent) {
                        return Err(GraphError::Inconsistent(format!(
                            "{child} is listed under both {previous} and {parent}"
                        )));
                    }
                    let back = self.get(child).and_then(Node::parent_link);
                    if back != Some(&ParentLink { node: parent, slot: slot.clone() }) {
                        return Err(GraphError::Inconsistent(format!(
                            "{child} is listed in {slot} of {parent} but links elsewhere"
                        )));
                    }
                }
            }
        }
        for (child, node) in self.iter() {
            if let Some(link) = &node.parent {
                if !self.holds(link.node, &link.slot, child) {
                    return Err(GraphError::Inconsistent(format!(
                        "{child} names {} as parent but is not listed there",
                        link.node
                    )));
                }
            }
            if self.ancestors(child).any(|a| a == child) {
                return Err(GraphError::Inconsistent(format!(
                    "{child} is its own ancestor"
                )));
            }
        }
        Ok(())
    }
}

impl Index<NodeRef> for NodeGraph {
    type Output = Node;

    fn index(&self, node: NodeRef) -> &Node {
        &self.nodes[node.index()]
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_ref(index: usize) -> NodeRef {
    NodeRef(index as u32)
}

/// Iterator over the ancestors of a node
///
/// Bounded by the graph size so a corrupted parent chain cannot loop forever.
#[derive(Debug)]
pub struct Ancestors<'g> {
    graph: &'g NodeGraph,
    current: Option<NodeRef>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let current = self.current?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.current = self.graph.get(current).and_then(Node::parent);
        Some(current)
    }
}
