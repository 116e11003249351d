//! Run report
//!
//! Every anomaly the pipeline met, together with what was done about it.

use crate::anomaly::{Anomaly, AnomalyKind, Outcome};

/// One handled anomaly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyRecord {
    /// What was wrong
    pub anomaly: Anomaly,
    /// What the run did
    pub outcome: Outcome,
}

/// Summary of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeserializationReport {
    /// Records in the chunk
    pub records: usize,
    /// Chunk nodes placed in the graph
    pub nodes_created: usize,
    /// Records left out (unknown classifier, duplicate id, dependent node)
    pub records_skipped: usize,
    /// Dependent nodes supplied for the run
    pub dependent_nodes: usize,
    /// Anomalies in detection order
    pub anomalies: Vec<AnomalyRecord>,
}

impl DeserializationReport {
    /// Whether the chunk resolved without anomalies
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Number of anomalies of `kind`
    #[must_use]
    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Anomalies of `kind`
    pub fn of_kind(&self, kind: AnomalyKind) -> impl Iterator<Item = &AnomalyRecord> {
        self.anomalies
            .iter()
            .filter(move |r| r.anomaly.kind() == kind)
    }

    /// Kinds in detection order
    #[must_use]
    pub fn kinds(&self) -> Vec<AnomalyKind> {
        self.anomalies.iter().map(|r| r.anomaly.kind()).collect()
    }

    pub(crate) fn push(&mut self, anomaly: Anomaly, outcome: Outcome) {
        self.anomalies.push(AnomalyRecord { anomaly, outcome });
    }
}
