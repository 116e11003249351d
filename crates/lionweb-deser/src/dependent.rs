//! Dependent nodes
//!
//! Nodes that already exist outside the chunk (in another chunk or a
//! repository) and may be referenced or contained by chunk nodes. They are
//! placed in the graph before resolution and never become roots.

use lionweb_meta::Classifier;
use std::sync::Arc;

/// One externally known node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentNode {
    /// Node id as it appears on the wire
    pub id: String,
    /// Classifier of the node
    pub classifier: Arc<Classifier>,
}

/// Set of dependent nodes for a run
#[derive(Debug, Clone, Default)]
pub struct DependentNodes {
    nodes: Vec<DependentNode>,
}

impl DependentNodes {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, classifier: Arc<Classifier>) -> Self {
        self.push(id, classifier);
        self
    }

    /// Add a node in place
    pub fn push(&mut self, id: impl Into<String>, classifier: Arc<Classifier>) {
        self.nodes.push(DependentNode {
            id: id.into(),
            classifier,
        });
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &DependentNode> {
        self.nodes.iter()
    }
}

impl FromIterator<DependentNode> for DependentNodes {
    fn from_iter<I: IntoIterator<Item = DependentNode>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
