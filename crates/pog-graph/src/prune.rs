//! Node and transition removal.
//!
//! Removing a node reroutes each sequence that passed through it: the
//! sequence's incoming edge is bridged directly to its outgoing edge.
//! Untagged edges, as built from inference, are bridged from every
//! predecessor to every successor instead. A successor left with no
//! predecessors can no longer be reached, so it is removed the same way,
//! repeatedly, until nothing is orphaned.

use crate::graph::PoGraph;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::Direction;
use pog_core::{NodeId, PogError, PogConfig, Result, SeqId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// What a removal changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removal {
    /// Nodes deleted, in removal order. Cascaded nodes follow the target.
    pub removed: Vec<NodeId>,

    /// Sequences whose path was cut, with the node where it was cut.
    ///
    /// A sequence lands here when it entered a removed node with no way
    /// out, or left one with no way in. That is either the sequence's
    /// real endpoint or an upstream inconsistency; the graph can't tell.
    pub truncated: Vec<(SeqId, NodeId)>,
}

impl Removal {
    fn merge(&mut self, other: Removal) {
        self.removed.extend(other.removed);
        self.truncated.extend(other.truncated);
    }
}

impl PoGraph {
    /// Removes a real node, bridging every sequence around it.
    ///
    /// With `config.cascade_removals`, successors orphaned by the removal
    /// are removed too.
    ///
    /// # Errors
    /// Fails for unknown nodes and for the sentinels.
    pub fn remove_node(&mut self, id: NodeId, config: &PogConfig) -> Result<Removal> {
        if id.is_sentinel() {
            return Err(PogError::InvalidSentinelEdit(id));
        }
        let index = self.index_of(id)?;

        let (mut report, orphans) = self.unlink_node(index);
        if config.cascade_removals {
            report.merge(self.cascade(orphans));
        }

        self.log_removal(&report);
        Ok(report)
    }

    /// Removes the single edge `from -> to`.
    ///
    /// Every sequence on the edge is cut there. With
    /// `config.cascade_removals`, `to` is removed if it has no other
    /// predecessor, and so on downstream.
    pub fn remove_transition(&mut self, from: NodeId, to: NodeId, config: &PogConfig) -> Result<Removal> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;

        let mut report = Removal::default();
        let Some(edge) = self.graph.find_edge(from_idx, to_idx) else {
            return Ok(report);
        };
        if let Some(weight) = self.graph.remove_edge(edge) {
            if !weight.seqs.is_empty() {
                report.truncated.extend(weight.seqs.into_iter().map(|s| (s, from)));
            } else if self
                .graph
                .neighbors_directed(from_idx, Direction::Outgoing)
                .next()
                .is_none()
            {
                // An untagged edge cuts the node's own sequences once it
                // was their last way out.
                let cut = self.graph[from_idx].seq_chars.keys().map(|s| (*s, from));
                report.truncated.extend(cut);
            }
        }

        if config.cascade_removals && self.is_orphan(to_idx) {
            report.merge(self.cascade(vec![to_idx]));
        }

        self.log_removal(&report);
        Ok(report)
    }

    /// Removes every real node with no predecessors.
    pub fn remove_orphans(&mut self) -> Removal {
        let orphans: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|index| self.is_orphan(*index))
            .collect();
        let report = self.cascade(orphans);
        self.log_removal(&report);
        report
    }

    fn is_orphan(&self, index: NodeIndex) -> bool {
        !self.graph[index].id.is_sentinel()
            && self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .next()
                .is_none()
    }

    /// Removes orphans with an explicit worklist rather than recursion.
    fn cascade(&mut self, mut pending: Vec<NodeIndex>) -> Removal {
        let mut report = Removal::default();

        while let Some(index) = pending.pop() {
            // Slots may have been emptied (or refilled) since this was queued.
            if !self.graph.contains_node(index) || !self.is_orphan(index) {
                continue;
            }
            debug!("cascading removal of orphaned node {}", self.graph[index].id);
            let (step, orphans) = self.unlink_node(index);
            report.merge(step);
            pending.extend(orphans);
        }

        report
    }

    /// Bridges sequences around one node, then deletes it.
    ///
    /// Returns the report for this node and any successors it orphaned.
    fn unlink_node(&mut self, index: NodeIndex) -> (Removal, Vec<NodeIndex>) {
        let id = self.graph[index].id;
        let incoming = self.edges_of(index, Direction::Incoming);
        let outgoing = self.edges_of(index, Direction::Outgoing);

        let mut report = Removal::default();
        let mut bridged: BTreeSet<SeqId> = BTreeSet::new();
        let mut bridges: Vec<(NodeIndex, NodeIndex, SeqId)> = Vec::new();

        for (in_edge, pred) in &incoming {
            for &seq in &self.graph[*in_edge].seqs {
                // A sequence visits a node at most once, so at most one
                // outgoing edge can carry it.
                let exit = outgoing
                    .iter()
                    .find(|(out_edge, _)| self.graph[*out_edge].carries(seq));
                match exit {
                    Some((_, succ)) => {
                        bridges.push((*pred, *succ, seq));
                        bridged.insert(seq);
                    }
                    None => report.truncated.push((seq, id)),
                }
            }
        }

        for (out_edge, _) in &outgoing {
            for &seq in &self.graph[*out_edge].seqs {
                if !bridged.contains(&seq) {
                    report.truncated.push((seq, id));
                }
            }
        }

        // Untagged edges come from inference and stand for the node's own
        // sequences. Every untagged way in is joined to every untagged way
        // out; a bridge is reciprocated only if both halves were.
        let untagged = |edges: &[(EdgeIndex, NodeIndex)]| -> Vec<(NodeIndex, bool)> {
            edges
                .iter()
                .filter(|(edge, _)| self.graph[*edge].seqs.is_empty())
                .map(|(edge, other)| (*other, self.graph[*edge].reciprocated))
                .collect()
        };
        let untagged_in = untagged(&incoming);
        let untagged_out = untagged(&outgoing);
        if untagged_in.is_empty() != untagged_out.is_empty() {
            let cut = self.graph[index]
                .seq_chars
                .keys()
                .filter(|seq| !bridged.contains(*seq))
                .map(|seq| (*seq, id));
            report.truncated.extend(cut);
        }

        for (pred, succ, seq) in bridges {
            self.tag(pred, succ, seq);
        }
        for (pred, pred_reciprocated) in &untagged_in {
            for (succ, succ_reciprocated) in &untagged_out {
                let edge = self.link(*pred, *succ);
                self.graph[edge].reciprocated |= *pred_reciprocated && *succ_reciprocated;
            }
        }

        self.remove_index(index);
        report.removed.push(id);

        let orphans = outgoing
            .into_iter()
            .map(|(_, succ)| succ)
            .filter(|succ| self.is_orphan(*succ))
            .collect();

        (report, orphans)
    }

    fn log_removal(&self, report: &Removal) {
        for (seq, at) in &report.truncated {
            warn!("sequence {} truncated at removed node {}", seq, at);
        }
        debug!(
            "removed {} nodes, {} remain",
            report.removed.len(),
            self.node_count()
        );
    }
}
