//! Two-pass chunk resolution
//!
//! 1. [`instantiate`]: one node per record, ids normalized, properties
//!    parsed. Records may arrive in any order.
//! 2. [`link`]: containments, references and annotations resolved against
//!    the full id table; declared parents checked last.
//!
//! Nothing escapes a failed run: the graph is owned by the run and only
//! handed out inside [`Deserialized`].

mod instantiate;
mod link;
mod parent;

use crate::anomaly::{Anomaly, Outcome};
use crate::config::DeserializerConfig;
use crate::dependent::DependentNodes;
use crate::error::{DeserializationError, DeserializationResult};
use crate::graph::{Node, NodeGraph, NodeOrigin, NodeRef};
use crate::handler::{AnomalyHandler, HandlerAbort};
use crate::report::DeserializationReport;
use lionweb_chunk::SerializedChunk;
use lionweb_meta::Metamodel;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Resolves chunks against one metamodel
///
/// # Example
/// ```
/// use lionweb_chunk::{SerializedChunk, SerializedNode};
/// use lionweb_deser::{Deserializer, IgnoringHandler};
/// use lionweb_meta::{builtins, LanguageRegistry};
///
/// let registry = LanguageRegistry::builder().build().unwrap();
/// let chunk = SerializedChunk::new().with_node(SerializedNode::new("n1", builtins::node()));
///
/// let result = Deserializer::new(&registry)
///     .deserialize(&chunk, &mut IgnoringHandler)
///     .unwrap();
/// assert_eq!(result.roots.len(), 1);
/// assert!(result.report.is_clean());
/// ```
#[derive(Debug)]
pub struct Deserializer<'m, M: Metamodel + ?Sized> {
    metamodel: &'m M,
    config: DeserializerConfig,
    dependents: DependentNodes,
}

impl<'m, M: Metamodel + ?Sized> Deserializer<'m, M> {
    /// Deserializer with the default configuration
    #[must_use]
    pub fn new(metamodel: &'m M) -> Self {
        Self {
            metamodel,
            config: DeserializerConfig::default(),
            dependents: DependentNodes::default(),
        }
    }

    /// With a configuration
    #[must_use]
    pub fn with_config(mut self, config: DeserializerConfig) -> Self {
        self.config = config;
        self
    }

    /// With externally known nodes
    #[must_use]
    pub fn with_dependent_nodes(mut self, dependents: DependentNodes) -> Self {
        self.dependents = dependents;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &DeserializerConfig {
        &self.config
    }

    /// Parse a JSON chunk and resolve it
    ///
    /// # Errors
    /// Malformed JSON, plus every error of [`Deserializer::deserialize`].
    pub fn deserialize_json(
        &self,
        json: &str,
        handler: &mut dyn AnomalyHandler,
    ) -> DeserializationResult<Deserialized> {
        let chunk = SerializedChunk::from_json_str(json)?;
        self.deserialize(&chunk, handler)
    }

    /// Resolve a chunk into a node graph
    ///
    /// # Errors
    /// - invalid configuration or (in strict mode) format version
    /// - the handler aborted
    /// - a handler substitute failed re-validation
    /// - renamed ids kept colliding
    pub fn deserialize(
        &self,
        chunk: &SerializedChunk,
        handler: &mut dyn AnomalyHandler,
    ) -> DeserializationResult<Deserialized> {
        let span = tracing::debug_span!("deserialize", records = chunk.nodes.len());
        let _guard = span.enter();

        self.config.validate()?;
        chunk.check_format_version(self.config.strict_format_version)?;
        for language in chunk.undeclared_languages() {
            warn!(
                "Chunk uses language {}@{} without declaring it",
                language.key, language.version
            );
        }

        let mut run = Resolution {
            metamodel: self.metamodel,
            config: &self.config,
            handler,
            graph: NodeGraph::new(self.config.id_mode()),
            report: DeserializationReport {
                records: chunk.nodes.len(),
                ..DeserializationReport::default()
            },
            created: Vec::with_capacity(chunk.nodes.len()),
        };
        run.load_dependents(&self.dependents);
        run.instantiate(chunk)?;
        run.link(chunk)?;
        run.resolve_parents(chunk)?;

        let Resolution { graph, report, .. } = run;
        debug_assert!(graph.verify_tree().is_ok());
        let roots = graph.roots();
        info!(
            "Deserialized {} of {} records into {} roots ({} anomalies)",
            report.nodes_created,
            report.records,
            roots.len(),
            report.anomalies.len()
        );
        Ok(Deserialized {
            graph,
            roots,
            report,
        })
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct Deserialized {
    /// Every node, dependent nodes included
    pub graph: NodeGraph,
    /// Parentless chunk nodes in first-seen order
    pub roots: Vec<NodeRef>,
    /// Anomalies and counters
    pub report: DeserializationReport,
}

impl Deserialized {
    /// Root nodes
    pub fn root_nodes(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().map(|r| &self.graph[*r])
    }

    /// Node by wire id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.lookup(id).map(|r| &self.graph[r])
    }
}

/// State of one run
struct Resolution<'r, M: ?Sized> {
    metamodel: &'r M,
    config: &'r DeserializerConfig,
    handler: &'r mut dyn AnomalyHandler,
    graph: NodeGraph,
    report: DeserializationReport,
    /// Node built for each chunk record, by record position
    created: Vec<Option<NodeRef>>,
}

impl<M: Metamodel + ?Sized> Resolution<'_, M> {
    fn load_dependents(&mut self, dependents: &DependentNodes) {
        let id_mode = self.config.id_mode();
        for dependent in dependents.iter() {
            let id = id_mode.node_id(&dependent.id);
            if self.graph.dependent_node(&id).is_some() {
                warn!("Dependent node '{}' supplied twice; keeping the first", dependent.id);
                continue;
            }
            let node = Node::new(id, dependent.classifier.clone(), NodeOrigin::Dependent);
            self.graph.insert(node);
            self.report.dependent_nodes += 1;
        }
    }

    /// Wire id of a node, for messages
    fn id_of(&self, node: NodeRef) -> String {
        self.graph[node].id().to_string()
    }

    fn note(&mut self, anomaly: Anomaly, outcome: Outcome) {
        debug!(kind = %anomaly.kind(), %outcome, "{anomaly}");
        self.report.push(anomaly, outcome);
    }

    /// Turn a handler answer into a run decision
    fn decide<T>(anomaly: &Anomaly, answer: Result<T, HandlerAbort>) -> DeserializationResult<T> {
        answer.map_err(|source| {
            warn!("Handler aborted on {anomaly}: {source}");
            DeserializationError::Aborted {
                anomaly: Box::new(anomaly.clone()),
                source,
            }
        })
    }

    fn invalid_substitute(
        anomaly: Anomaly,
        substitute: impl Display,
        reason: impl Into<String>,
    ) -> DeserializationError {
        let reason = reason.into();
        warn!("Rejected substitute {substitute} for {anomaly}: {reason}");
        DeserializationError::InvalidSubstitute {
            anomaly: Box::new(anomaly),
            substitute: substitute.to_string(),
            reason,
        }
    }

    /// Check that a handler-supplied node belongs to the graph
    fn known_node(&self, anomaly: &Anomaly, node: NodeRef) -> DeserializationResult<()> {
        if self.graph.contains(node) {
            Ok(())
        } else {
            Err(Self::invalid_substitute(
                anomaly.clone(),
                node,
                "node is not part of the graph",
            ))
        }
    }
}
