//! Core graph data structure.
//!
//! `PoGraph` wraps a petgraph stable graph (an arena of nodes and edges
//! whose indices survive removals) and adds an index from `NodeId` to
//! arena slot plus the sequence registry. Everything else in the crate
//! works through it.

use crate::edge::Edge;
use crate::node::GraphNode;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use pog_core::{NodeId, PogError, Result, SeqId, GAP};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A partial order graph over a set of sequences.
///
/// Cloning copies the arena wholesale; indices stay valid in the copy.
#[derive(Debug, Clone)]
pub struct PoGraph {
    /// Node and edge arena.
    pub(crate) graph: StableDiGraph<GraphNode, Edge>,

    /// Maps node identities to arena slots.
    id_index: HashMap<NodeId, NodeIndex>,

    /// Registered sequences, id to label.
    sequences: BTreeMap<SeqId, String>,

    /// Number of alignment columns the real nodes are numbered over.
    width: usize,

    next_serial: u64,
}

impl Default for PoGraph {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PoGraph {
    /// Creates a graph holding only the virtual start and end nodes.
    pub fn new(width: usize) -> Self {
        let mut graph = Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            sequences: BTreeMap::new(),
            width,
            next_serial: 0,
        };
        graph.add_node(GraphNode::new(NodeId::Start));
        graph.add_node(GraphNode::new(NodeId::End));
        graph
    }

    /// Adds a node to the arena and indexes it. Replaces nothing: the
    /// caller guarantees the id is new.
    pub(crate) fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id;
        let index = self.graph.add_node(node);
        self.id_index.insert(id, index);
        index
    }

    /// Removes a node and every edge touching it.
    pub(crate) fn remove_index(&mut self, index: NodeIndex) -> Option<GraphNode> {
        let node = self.graph.remove_node(index)?;
        self.id_index.remove(&node.id);
        Some(node)
    }

    /// Returns the edge `from -> to`, creating an empty one if needed.
    pub(crate) fn link(&mut self, from: NodeIndex, to: NodeIndex) -> EdgeIndex {
        if let Some(edge) = self.graph.find_edge(from, to) {
            return edge;
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        self.graph.add_edge(from, to, Edge::new(serial))
    }

    /// Records that `seq` travels `from -> to`.
    pub(crate) fn tag(&mut self, from: NodeIndex, to: NodeIndex, seq: SeqId) -> EdgeIndex {
        let edge = self.link(from, to);
        self.graph[edge].seqs.insert(seq);
        edge
    }

    pub(crate) fn register_sequence(&mut self, id: SeqId, label: impl Into<String>) -> Result<()> {
        if self.sequences.contains_key(&id) {
            return Err(PogError::DuplicateSequence { id });
        }
        self.sequences.insert(id, label.into());
        Ok(())
    }

    pub(crate) fn set_width(&mut self, width: usize) {
        self.width = width;
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(PogError::UnknownNode(id))
    }

    pub(crate) fn start_index(&self) -> NodeIndex {
        self.id_index[&NodeId::Start]
    }

    pub(crate) fn end_index(&self) -> NodeIndex {
        self.id_index[&NodeId::End]
    }

    /// Edges leaving or entering `index`, in insertion order.
    pub(crate) fn edges_of(&self, index: NodeIndex, direction: Direction) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<(EdgeIndex, NodeIndex, u64)> = self
            .graph
            .edges_directed(index, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (e.id(), other, e.weight().serial)
            })
            .collect();
        edges.sort_by_key(|(_, _, serial)| *serial);
        edges.into_iter().map(|(e, n, _)| (e, n)).collect()
    }

    /// Gets a node by identity.
    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        let index = self.id_index.get(&id)?;
        self.graph.node_weight(*index)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Identities of all real nodes, ascending.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .id_index
            .keys()
            .filter(|id| !id.is_sentinel())
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Iterates over all nodes, sentinels included.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Returns the number of real nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count().saturating_sub(2)
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Gets the edge `from -> to`.
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
        let from = *self.id_index.get(&from)?;
        let to = *self.id_index.get(&to)?;
        let edge = self.graph.find_edge(from, to)?;
        self.graph.edge_weight(edge)
    }

    /// Outgoing edges of a node, in insertion order.
    pub fn successors(&self, id: NodeId) -> Result<Vec<(NodeId, &Edge)>> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Incoming edges of a node, in insertion order.
    pub fn predecessors(&self, id: NodeId) -> Result<Vec<(NodeId, &Edge)>> {
        self.neighbours(id, Direction::Incoming)
    }

    fn neighbours(&self, id: NodeId, direction: Direction) -> Result<Vec<(NodeId, &Edge)>> {
        let index = self.index_of(id)?;
        Ok(self
            .edges_of(index, direction)
            .into_iter()
            .map(|(edge, other)| (self.graph[other].id, &self.graph[edge]))
            .collect())
    }

    /// All edges as `(from, to, edge)`, ordered by endpoints.
    pub fn edges(&self) -> Vec<(NodeId, NodeId, &Edge)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (self.graph[e.source()].id, self.graph[e.target()].id, e.weight()))
            .collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));
        edges
    }

    /// Registered sequences, id to label.
    pub fn sequences(&self) -> &BTreeMap<SeqId, String> {
        &self.sequences
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Number of alignment columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Recomputes each edge's cached support weight.
    pub fn refresh_support(&mut self) {
        let total = self.sequences.len();
        for edge in self.graph.edge_weights_mut() {
            edge.weight = (total > 0).then(|| edge.support_fraction(total));
        }
    }

    /// Nodes visited by one sequence, start to end, sentinels excluded.
    ///
    /// # Errors
    /// `IncompleteSequence` if the sequence's edges stop short of the end
    /// node. That happens to sequences truncated by pruning and to the
    /// ancestor of an inference graph, whose edges carry no sequence ids.
    pub fn sequence_path(&self, seq: SeqId) -> Result<Vec<NodeId>> {
        if !self.sequences.contains_key(&seq) {
            return Err(PogError::UnknownSequence(seq));
        }

        let end = self.end_index();
        let mut path = Vec::new();
        let mut current = self.start_index();

        // Every step moves forward in a DAG, so this bounds the walk.
        for _ in 0..self.graph.node_count() {
            let next = self
                .edges_of(current, Direction::Outgoing)
                .into_iter()
                .find(|(edge, _)| self.graph[*edge].carries(seq));

            match next {
                Some((_, target)) if target == end => return Ok(path),
                Some((_, target)) => {
                    path.push(self.graph[target].id);
                    current = target;
                }
                None => break,
            }
        }

        let at = self.graph[current].id;
        debug!("sequence {} stops at {}", seq, at);
        Err(PogError::IncompleteSequence { id: seq, at })
    }

    /// Reads one sequence back out of the graph.
    ///
    /// With `gapped`, unvisited columns are filled with gap characters so
    /// the result has the alignment width.
    pub fn sequence(&self, seq: SeqId, gapped: bool) -> Result<String> {
        let path = self.sequence_path(seq)?;
        Ok(self.render_path(&path, gapped, |node| {
            node.seq_chars.get(&seq).copied().or_else(|| node.display_char())
        }))
    }

    /// Renders a path of real nodes as text.
    pub(crate) fn render_path<F>(&self, path: &[NodeId], gapped: bool, pick: F) -> String
    where
        F: Fn(&GraphNode) -> Option<char>,
    {
        let mut out = String::with_capacity(if gapped { self.width } else { path.len() });
        let mut next_column = 0;

        for id in path {
            let Some(node) = self.get(*id) else { continue };
            if let (true, Some(column)) = (gapped, id.column()) {
                out.extend(std::iter::repeat(GAP).take(column.saturating_sub(next_column)));
                next_column = column + 1;
            }
            if let Some(c) = pick(node) {
                out.push(c);
            }
        }

        if gapped {
            out.extend(std::iter::repeat(GAP).take(self.width.saturating_sub(next_column)));
        }
        out
    }
}

/// Graph statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub sequences: usize,
    pub width: usize,
}

impl PoGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            sequences: self.sequence_count(),
            width: self.width,
        }
    }
}
