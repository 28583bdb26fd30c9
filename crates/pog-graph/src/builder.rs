//! Graph construction.
//!
//! Two sources feed a graph: a multiple sequence alignment, where every
//! column becomes a node, and the output of indel-transition inference,
//! where each surviving ancestral position becomes a node and inferred
//! transitions become edges.

use crate::graph::PoGraph;
use crate::node::GraphNode;
use petgraph::stable_graph::NodeIndex;
use pog_core::{is_gap, AlignedSequence, NodeId, PogError, Result, Residue, SeqId, TransitionRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

impl PoGraph {
    /// Builds a graph from equal-width aligned rows.
    ///
    /// Column `c` becomes node `c`. Each row links its consecutive
    /// non-gap columns with edges tagged by the row id, from the virtual
    /// start to the virtual end.
    ///
    /// # Errors
    /// Fails if rows differ in width, if two rows share an id, or if a
    /// column holds only gaps.
    pub fn from_alignment(rows: &[AlignedSequence]) -> Result<Self> {
        let width = rows.first().map(AlignedSequence::width).unwrap_or(0);
        let mut graph = PoGraph::new(width);

        for row in rows {
            if row.width() != width {
                return Err(PogError::RaggedAlignment {
                    id: row.id,
                    expected: width,
                    found: row.width(),
                });
            }
            graph.register_sequence(row.id, row.label.clone())?;
        }

        // Last node each row passed through.
        let start = graph.start_index();
        let mut last: Vec<NodeIndex> = vec![start; rows.len()];

        for column in 0..width {
            let seq_chars: BTreeMap<SeqId, char> = rows
                .iter()
                .filter(|row| !is_gap(row.chars[column]))
                .map(|row| (row.id, row.chars[column]))
                .collect();

            if seq_chars.is_empty() {
                return Err(PogError::EmptyColumn { column });
            }

            let node = graph.add_node(GraphNode::with_chars(NodeId::Pos(column), seq_chars));

            for (i, row) in rows.iter().enumerate() {
                if !is_gap(row.chars[column]) {
                    graph.tag(last[i], node, row.id);
                    last[i] = node;
                }
            }
        }

        let end = graph.end_index();
        for (i, row) in rows.iter().enumerate() {
            graph.tag(last[i], end, row.id);
        }

        debug!(
            "built graph from {} sequences: {} nodes, {} edges",
            rows.len(),
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }

    /// Builds a single-ancestor graph from indel-transition inference.
    ///
    /// Every surviving position records its base under `ancestor`. See
    /// [`TransitionBuilder`] for how transitions are resolved.
    pub fn from_inference(
        records: &[TransitionRecord],
        ancestor: SeqId,
        label: impl Into<String>,
    ) -> Result<Self> {
        let mut builder = TransitionBuilder::new(ancestor, label)?;
        builder.add_records(records);
        Ok(builder.build())
    }
}

/// Which directional scans listed a transition.
#[derive(Debug, Default, Clone, Copy)]
struct Scans {
    /// Listed by the record of the lower endpoint.
    forward: bool,
    /// Listed by the record of the higher endpoint.
    backward: bool,
}

/// Builds a graph from inference records.
///
/// The builder handles the two-pass process:
/// 1. Add all surviving positions as nodes
/// 2. Resolve canonical transitions into edges
///
/// A position marked absent is excluded, and so is every transition
/// naming it, no matter which record listed it.
pub struct TransitionBuilder {
    graph: PoGraph,
    ancestor: SeqId,
    excluded: BTreeSet<NodeId>,
    /// Canonical `(lower, higher)` pairs and the scans that saw them.
    transitions: BTreeMap<(NodeId, NodeId), Scans>,
}

impl TransitionBuilder {
    /// Creates a new builder for one ancestor.
    pub fn new(ancestor: SeqId, label: impl Into<String>) -> Result<Self> {
        let mut graph = PoGraph::new(0);
        graph.register_sequence(ancestor, label)?;
        Ok(Self {
            graph,
            ancestor,
            excluded: BTreeSet::new(),
            transitions: BTreeMap::new(),
        })
    }

    /// Adds records to the graph.
    ///
    /// Call this for each batch of records, then call `build` once all
    /// are added.
    pub fn add_records(&mut self, records: &[TransitionRecord]) {
        for record in records {
            let position = record.position;

            if let Some(column) = position.column() {
                if column >= self.graph.width() {
                    self.graph.set_width(column + 1);
                }
            }

            if record.is_absent() {
                if self.excluded.insert(position) {
                    if let Ok(index) = self.graph.index_of(position) {
                        self.graph.remove_index(index);
                    }
                }
            } else if let Residue::Base(base) = record.residue {
                if !position.is_sentinel()
                    && !self.excluded.contains(&position)
                    && !self.graph.contains(position)
                {
                    let mut node = GraphNode::new(position);
                    node.base = Some(base);
                    node.seq_chars.insert(self.ancestor, base);
                    self.graph.add_node(node);
                }
            }

            for &target in &record.targets {
                if target == position {
                    continue;
                }
                let pair = (position.min(target), position.max(target));
                let scans = self.transitions.entry(pair).or_default();
                if position < target {
                    scans.forward = true;
                } else {
                    scans.backward = true;
                }
            }
        }
    }

    /// Resolves collected transitions into edges.
    ///
    /// Transitions touching an excluded position are skipped. A transition
    /// whose endpoint still cannot be found has no node behind it at all;
    /// it is dropped with a warning.
    pub fn resolve_edges(&mut self) {
        let transitions = std::mem::take(&mut self.transitions);
        let mut dropped = 0usize;

        for ((from, to), scans) in transitions {
            if self.excluded.contains(&from) || self.excluded.contains(&to) {
                continue;
            }

            let (from_idx, to_idx) = match (self.graph.index_of(from), self.graph.index_of(to)) {
                (Ok(f), Ok(t)) => (f, t),
                _ => {
                    warn!("dropping transition {} -> {}: endpoint has no node", from, to);
                    dropped += 1;
                    continue;
                }
            };

            let edge = self.graph.link(from_idx, to_idx);
            self.graph.graph[edge].reciprocated = scans.forward && scans.backward;
        }

        debug!(
            "resolved inference graph: {} nodes, {} edges, {} excluded positions, {} dropped transitions",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.excluded.len(),
            dropped
        );
    }

    /// Finishes building and returns the graph.
    pub fn build(mut self) -> PoGraph {
        self.resolve_edges();
        self.graph
    }
}
