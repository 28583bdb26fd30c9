//! Edge records for the partial order graph.
//!
//! One edge exists per ordered node pair. It remembers which sequences
//! pass along it, so a sequence can always be re-read from the graph.

use pog_core::SeqId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A transition between two positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Sequences that traverse this edge.
    pub seqs: BTreeSet<SeqId>,

    /// Set when both directional scans of the transition data agree.
    pub reciprocated: bool,

    /// Set when the edge lies on the last extracted consensus path.
    pub consensus: bool,

    /// Cached fraction of all sequences that use this edge.
    pub weight: Option<f64>,

    /// Insertion order, used to break support ties.
    pub(crate) serial: u64,
}

impl Edge {
    pub(crate) fn new(serial: u64) -> Self {
        Self {
            seqs: BTreeSet::new(),
            reciprocated: false,
            consensus: false,
            weight: None,
            serial,
        }
    }

    /// Number of sequences supporting this edge.
    pub fn support(&self) -> usize {
        self.seqs.len()
    }

    /// Fraction of `total` sequences that use this edge.
    pub fn support_fraction(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.seqs.len() as f64 / total as f64
        }
    }

    pub fn carries(&self, seq: SeqId) -> bool {
        self.seqs.contains(&seq)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.seqs.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", ids.join(","))
    }
}
