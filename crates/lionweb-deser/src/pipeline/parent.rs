//! Declared parent pointers
//!
//! Checked after every containment and annotation is in place. Containment
//! lists win over parent pointers. A pointer whose target cannot be found
//! always goes to the handler; for a node that is already contained, only
//! its current parent is an acceptable substitute.

use super::Resolution;
use crate::anomaly::{Anomaly, Outcome};
use crate::error::DeserializationResult;
use crate::graph::{NodeRef, Slot};
use lionweb_chunk::SerializedChunk;
use lionweb_meta::{FeatureKind, Metamodel};
use tracing::{debug, warn};

impl<M: Metamodel + ?Sized> Resolution<'_, M> {
    pub(super) fn resolve_parents(&mut self, chunk: &SerializedChunk) -> DeserializationResult<()> {
        for (index, record) in chunk.nodes.iter().enumerate() {
            let (Some(node), Some(declared)) = (self.created[index], record.parent.as_deref())
            else {
                continue;
            };
            self.resolve_parent(node, declared)?;
        }
        Ok(())
    }

    fn resolve_parent(&mut self, node: NodeRef, declared: &str) -> DeserializationResult<()> {
        let Some(declared_ref) = self.graph.lookup(declared) else {
            return self.heal_parent(node, declared);
        };
        match self.graph[node].parent() {
            Some(actual) if actual != declared_ref => warn!(
                "Node '{}' declares parent '{declared}' but is contained by '{}'",
                self.id_of(node),
                self.id_of(actual)
            ),
            Some(_) => {}
            None if self.graph[declared_ref].is_dependent() => debug!(
                "Node '{}' belongs to dependent node '{declared}'; keeping it as a root",
                self.id_of(node)
            ),
            None => warn!(
                "Node '{}' declares parent '{declared}', which does not contain it; keeping it as a root",
                self.id_of(node)
            ),
        }
        Ok(())
    }

    fn heal_parent(&mut self, node: NodeRef, declared: &str) -> DeserializationResult<()> {
        let anomaly = Anomaly::UnresolvableParent {
            node: self.id_of(node),
            parent: declared.to_string(),
        };
        let answer = self
            .handler
            .unresolvable_parent(&mut self.graph, node, declared);
        let Some(parent) = Self::decide(&anomaly, answer)? else {
            self.note(anomaly, Outcome::Dropped);
            return Ok(());
        };
        self.known_node(&anomaly, parent)?;
        let substitute = format!("'{}'", self.id_of(parent));

        match self.graph[node].parent() {
            Some(current) if current == parent => {
                self.note(anomaly, Outcome::Healed);
                return Ok(());
            }
            Some(_) => {
                return Err(Self::invalid_substitute(
                    anomaly,
                    substitute,
                    "the node is already contained by another parent",
                ));
            }
            None => {}
        }
        if self.graph.would_create_cycle(parent, node) {
            return Err(Self::invalid_substitute(
                anomaly,
                substitute,
                "the node would contain itself",
            ));
        }
        let Some(slot) = self.adoption_slot(parent, node) else {
            return Err(Self::invalid_substitute(
                anomaly,
                substitute,
                "no containment of the parent accepts the node",
            ));
        };
        self.graph.link(parent, slot, node);
        self.note(anomaly, Outcome::Healed);
        Ok(())
    }

    /// First slot of `parent` that can take `node`
    fn adoption_slot(&self, parent: NodeRef, node: NodeRef) -> Option<Slot> {
        let host = self.graph[parent].classifier();
        let classifier = self.graph[node].classifier();
        if classifier.is_annotation() {
            return self
                .metamodel
                .is_valid_annotation_target(classifier, host)
                .then_some(Slot::Annotation);
        }
        self.metamodel
            .features(host)
            .into_iter()
            .filter(|f| f.kind() == FeatureKind::Containment)
            .find(|f| {
                self.metamodel.conforms_to(classifier, f.ty())
                    && (f.is_multiple() || self.graph[parent].children(f.key()).is_empty())
            })
            .map(|f| Slot::Containment(f.key().to_string()))
    }
}
