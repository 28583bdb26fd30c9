//! Most-supported path extraction.
//!
//! A greedy single pass from the virtual start to the virtual end. It is
//! not guaranteed optimal; a provably best path needs a global search.

use crate::graph::PoGraph;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::Direction;
use pog_core::{ConsensusConfig, NodeId, SeqId};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A consensus walk through the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    /// Real nodes on the path, in order.
    pub path: Vec<NodeId>,
    /// Characters of the path, gapped if requested.
    pub sequence: String,
}

impl PoGraph {
    /// Extracts the best-supported path and marks it on the graph.
    ///
    /// At each node the next edge is picked as follows:
    /// 1. With `prefer_reciprocated`, if exactly one reciprocated edge is
    ///    consistent with the path so far, take it ("lone reciprocated"
    ///    rule; several reciprocated candidates fall through to step 2).
    /// 2. Otherwise take the consistent edge with the most sequences,
    ///    ties going to the earliest inserted.
    ///
    /// An edge is consistent when it carries at least one of the sequences
    /// that followed every edge chosen so far, or carries none at all.
    /// If no edge is consistent, all outgoing edges are candidates.
    pub fn consensus(&mut self, config: &ConsensusConfig) -> Consensus {
        self.clear_consensus();

        let end = self.end_index();
        let mut current = self.start_index();
        let mut active: BTreeSet<SeqId> = self.sequences().keys().copied().collect();
        let mut path = Vec::new();

        // A DAG walk visits each node at most once.
        for _ in 0..self.graph.node_count() {
            if current == end {
                break;
            }
            let Some((edge, next)) = self.choose_edge(current, &active, config) else {
                warn!("consensus walk stopped at dead end {}", self.graph[current].id);
                break;
            };

            self.graph[edge].consensus = true;
            self.graph[next].consensus = true;

            let seqs = &self.graph[edge].seqs;
            if !seqs.is_empty() {
                let narrowed: BTreeSet<SeqId> = active.intersection(seqs).copied().collect();
                active = if narrowed.is_empty() { seqs.clone() } else { narrowed };
            }

            if next != end {
                path.push(self.graph[next].id);
            }
            current = next;
        }

        let sequence = self.render_path(&path, config.gapped, |node| node.display_char());
        debug!("consensus path covers {} nodes", path.len());

        Consensus { path, sequence }
    }

    fn choose_edge(
        &self,
        from: NodeIndex,
        active: &BTreeSet<SeqId>,
        config: &ConsensusConfig,
    ) -> Option<(EdgeIndex, NodeIndex)> {
        let outgoing = self.edges_of(from, Direction::Outgoing);

        let consistent: Vec<(EdgeIndex, NodeIndex)> = outgoing
            .iter()
            .copied()
            .filter(|(edge, _)| {
                let seqs = &self.graph[*edge].seqs;
                seqs.is_empty() || !seqs.is_disjoint(active)
            })
            .collect();
        let candidates = if consistent.is_empty() { outgoing } else { consistent };

        if config.prefer_reciprocated {
            let mut reciprocated = candidates
                .iter()
                .filter(|(edge, _)| self.graph[*edge].reciprocated);
            if let (Some(only), None) = (reciprocated.next(), reciprocated.next()) {
                return Some(*only);
            }
        }

        candidates.into_iter().min_by_key(|(edge, _)| {
            let edge = &self.graph[*edge];
            (Reverse(edge.support()), edge.serial)
        })
    }

    /// Clears consensus flags on every node and edge.
    pub fn clear_consensus(&mut self) {
        for node in self.graph.node_weights_mut() {
            node.consensus = false;
        }
        for edge in self.graph.edge_weights_mut() {
            edge.consensus = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pog_core::AlignedSequence;

    fn make_graph(rows: &[(SeqId, &str)]) -> PoGraph {
        let rows: Vec<AlignedSequence> = rows
            .iter()
            .map(|(id, s)| AlignedSequence::new(*id, format!("seq{}", id), s))
            .collect();
        PoGraph::from_alignment(&rows).unwrap()
    }

    fn gapped() -> ConsensusConfig {
        ConsensusConfig {
            gapped: true,
            ..ConsensusConfig::default()
        }
    }

    #[test]
    fn test_majority_column() {
        let mut graph = make_graph(&[(1, "AC"), (2, "AG"), (3, "AC")]);

        let plain = graph.consensus(&ConsensusConfig::default());
        assert_eq!(plain.sequence, "AC");
        assert_eq!(plain.path, vec![NodeId::Pos(0), NodeId::Pos(1)]);

        let with_gaps = graph.consensus(&gapped());
        assert_eq!(with_gaps.sequence, "AC");
    }

    #[test]
    fn test_follows_supported_branch_with_gaps() {
        // Two of three sequences skip columns 1 and 2.
        let mut graph = make_graph(&[(1, "ACGT"), (2, "A--T"), (3, "A--T")]);

        let result = graph.consensus(&gapped());
        assert_eq!(result.path, vec![NodeId::Pos(0), NodeId::Pos(3)]);
        assert_eq!(result.sequence, "A--T");

        let plain = graph.consensus(&ConsensusConfig::default());
        assert_eq!(plain.sequence, "AT");
    }

    #[test]
    fn test_leading_and_trailing_gaps() {
        let mut graph = make_graph(&[(1, "-CG-"), (2, "ACGT"), (3, "-CG-")]);
        let result = graph.consensus(&gapped());
        assert_eq!(result.sequence, "-CG-");
    }

    #[test]
    fn test_marks_path() {
        let mut graph = make_graph(&[(1, "ACGT"), (2, "A--T"), (3, "A--T")]);
        graph.consensus(&ConsensusConfig::default());

        assert!(graph.get(NodeId::Pos(0)).unwrap().consensus);
        assert!(!graph.get(NodeId::Pos(1)).unwrap().consensus);
        assert!(graph.edge(NodeId::Pos(0), NodeId::Pos(3)).unwrap().consensus);
        assert!(!graph.edge(NodeId::Pos(0), NodeId::Pos(1)).unwrap().consensus);

        graph.clear_consensus();
        assert!(!graph.get(NodeId::Pos(0)).unwrap().consensus);
    }

    #[test]
    fn test_stays_with_consistent_sequences() {
        // Sequences 1-3 reach column 1 through column 0. There, 1 -> 2 has
        // more support overall, but none of it from sequences on the path.
        let mut graph = make_graph(&[
            (1, "AC-T"),
            (2, "AC-T"),
            (3, "AC-T"),
            (4, "-CG-"),
            (5, "-CG-"),
            (6, "X-G-"),
            (7, "X-G-"),
            (8, "-CG-"),
            (9, "-CG-"),
        ]);
        let result = graph.consensus(&ConsensusConfig::default());
        assert_eq!(result.path, vec![NodeId::Pos(0), NodeId::Pos(1), NodeId::Pos(3)]);
        assert_eq!(result.sequence, "ACT");
    }

    fn no_preference() -> ConsensusConfig {
        ConsensusConfig {
            prefer_reciprocated: false,
            ..ConsensusConfig::default()
        }
    }

    #[test]
    fn test_lone_reciprocated_edge_beats_support() {
        // 0 -> 1 is reciprocated with one sequence, 0 -> 2 has two.
        let text = r#"digraph {
    start [ id="start" ]
    end [ id="end" ]
    0 [ seqs="1:M,2:M,3:M" ]
    1 [ seqs="1:K" ]
    2 [ seqs="2:R,3:R" ]
    start -> 0 [ seqs="1,2,3" ]
    0 -> 1 [ seqs="1", reciprocated=true ]
    0 -> 2 [ seqs="2,3" ]
    1 -> end [ seqs="1" ]
    2 -> end [ seqs="2,3" ]
}"#;
        let mut graph = PoGraph::from_dot(text).unwrap();

        let preferred = graph.consensus(&ConsensusConfig::default());
        assert_eq!(preferred.path, vec![NodeId::Pos(0), NodeId::Pos(1)]);
        assert_eq!(preferred.sequence, "MK");

        let by_support = graph.consensus(&no_preference());
        assert_eq!(by_support.path, vec![NodeId::Pos(0), NodeId::Pos(2)]);
        assert_eq!(by_support.sequence, "MR");
    }

    #[test]
    fn test_several_reciprocated_fall_through_to_support() {
        let text = r#"digraph {
    start [ id="start" ]
    end [ id="end" ]
    0 [ seqs="1:M,2:M,3:M,4:M,5:M" ]
    1 [ seqs="1:K" ]
    2 [ seqs="2:R" ]
    3 [ seqs="3:S,4:S,5:S" ]
    start -> 0 [ seqs="1,2,3,4,5" ]
    0 -> 1 [ seqs="1", reciprocated=true ]
    0 -> 2 [ seqs="2", reciprocated=true ]
    0 -> 3 [ seqs="3,4,5" ]
    1 -> end [ seqs="1" ]
    2 -> end [ seqs="2" ]
    3 -> end [ seqs="3,4,5" ]
}"#;
        let mut graph = PoGraph::from_dot(text).unwrap();

        assert_eq!(graph.consensus(&ConsensusConfig::default()).sequence, "MS");
        assert_eq!(graph.consensus(&no_preference()).sequence, "MS");
    }

    #[test]
    fn test_support_ties_go_to_first_inserted_edge() {
        // 0 -> 2 is listed, and so inserted, before 0 -> 1.
        let text = r#"digraph {
    start [ id="start" ]
    end [ id="end" ]
    0 [ seqs="1:M,2:M" ]
    1 [ seqs="1:K" ]
    2 [ seqs="2:R" ]
    start -> 0 [ seqs="1,2" ]
    0 -> 2 [ seqs="2", reciprocated=true ]
    0 -> 1 [ seqs="1", reciprocated=true ]
    1 -> end [ seqs="1" ]
    2 -> end [ seqs="2" ]
}"#;
        let mut graph = PoGraph::from_dot(text).unwrap();

        assert_eq!(graph.consensus(&ConsensusConfig::default()).sequence, "MR");
        assert_eq!(graph.consensus(&no_preference()).sequence, "MR");
    }
}
