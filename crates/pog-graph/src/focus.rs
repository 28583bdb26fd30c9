//! Stepwise query API.
//!
//! A [`Focus`] names one node and is passed by value between calls.
//! [`PoGraph::view`] turns it into a borrowed [`NodeView`] for reading;
//! edits go through `PoGraph` methods that take the focus.

use crate::edge::Edge;
use crate::graph::PoGraph;
use crate::node::GraphNode;
use crate::prune::Removal;
use petgraph::Direction;
use pog_core::{Distribution, NodeId, PogConfig, PogError, Result, SeqId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Handle on one node of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Focus {
    id: NodeId,
}

impl Focus {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

/// How to list a node's neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighbourQuery {
    /// Most-supported first (stable on ties) instead of insertion order.
    pub by_support: bool,
    /// Only neighbours joined by a reciprocated edge.
    pub reciprocated_only: bool,
}

/// Read-only view of a focused node.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    graph: &'a PoGraph,
    node: &'a GraphNode,
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn node(&self) -> &'a GraphNode {
        self.node
    }

    pub fn base(&self) -> Option<char> {
        self.node.base
    }

    pub fn distribution(&self) -> Option<&'a Distribution> {
        self.node.distribution.as_ref()
    }

    pub fn seq_chars(&self) -> &'a BTreeMap<SeqId, char> {
        &self.node.seq_chars
    }

    pub fn histogram(&self) -> BTreeMap<char, usize> {
        self.node.histogram()
    }

    /// Ids of successor nodes.
    pub fn next(&self, query: NeighbourQuery) -> Vec<NodeId> {
        self.neighbours(Direction::Outgoing, query)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Ids of predecessor nodes.
    pub fn previous(&self, query: NeighbourQuery) -> Vec<NodeId> {
        self.neighbours(Direction::Incoming, query)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Successors with the fraction of sequences on each edge.
    pub fn next_weights(&self, query: NeighbourQuery) -> Vec<(NodeId, f64)> {
        self.weighted(Direction::Outgoing, query)
    }

    /// Predecessors with the fraction of sequences on each edge.
    pub fn previous_weights(&self, query: NeighbourQuery) -> Vec<(NodeId, f64)> {
        self.weighted(Direction::Incoming, query)
    }

    fn weighted(&self, direction: Direction, query: NeighbourQuery) -> Vec<(NodeId, f64)> {
        let total = self.graph.sequence_count();
        self.neighbours(direction, query)
            .into_iter()
            .map(|(id, edge)| (id, edge.weight.unwrap_or_else(|| edge.support_fraction(total))))
            .collect()
    }

    fn neighbours(&self, direction: Direction, query: NeighbourQuery) -> Vec<(NodeId, &'a Edge)> {
        let graph = self.graph;
        let Ok(index) = graph.index_of(self.node.id) else {
            return Vec::new();
        };
        let mut found: Vec<(NodeId, &'a Edge)> = graph
            .edges_of(index, direction)
            .into_iter()
            .map(|(edge, other)| (graph.graph[other].id, &graph.graph[edge]))
            .filter(|(_, edge)| !query.reciprocated_only || edge.reciprocated)
            .collect();
        if query.by_support {
            found.sort_by_key(|(_, edge)| Reverse(edge.support()));
        }
        found
    }
}

impl PoGraph {
    /// Focuses on a node.
    pub fn focus(&self, id: NodeId) -> Result<Focus> {
        self.index_of(id)?;
        Ok(Focus { id })
    }

    /// Views the focused node. Fails if it has since been removed.
    pub fn view(&self, focus: Focus) -> Result<NodeView<'_>> {
        let index = self.index_of(focus.id)?;
        Ok(NodeView {
            graph: self,
            node: &self.graph[index],
        })
    }

    fn focused_mut(&mut self, focus: Focus) -> Result<&mut GraphNode> {
        if focus.id.is_sentinel() {
            return Err(PogError::InvalidSentinelEdit(focus.id));
        }
        let index = self.index_of(focus.id)?;
        Ok(&mut self.graph[index])
    }

    /// Resolves the focused node to a character.
    pub fn set_base(&mut self, focus: Focus, base: char) -> Result<()> {
        self.focused_mut(focus)?.base = Some(base);
        Ok(())
    }

    /// Attaches an inferred state distribution to the focused node.
    pub fn set_distribution(&mut self, focus: Focus, distribution: Distribution) -> Result<()> {
        self.focused_mut(focus)?.distribution = Some(distribution);
        Ok(())
    }

    /// Records the nodes that are alternatives to the focused one.
    pub fn set_alignment_group(&mut self, focus: Focus, group: BTreeSet<NodeId>) -> Result<()> {
        self.focused_mut(focus)?.alignment_group = Some(group);
        Ok(())
    }

    /// Removes the focused node. See [`PoGraph::remove_node`].
    pub fn remove_focused(&mut self, focus: Focus, config: &PogConfig) -> Result<Removal> {
        self.remove_node(focus.id, config)
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

    #[test]
    fn test_view_contents() {
        let graph = make_graph(&[(1, "AC"), (2, "AG"), (3, "AC")]);

        let n0 = graph.view(graph.focus(NodeId::Pos(0)).unwrap()).unwrap();
        assert_eq!(n0.base(), Some('A'));
        assert_eq!(n0.seq_chars(), &BTreeMap::from([(1, 'A'), (2, 'A'), (3, 'A')]));

        let n1 = graph.view(graph.focus(NodeId::Pos(1)).unwrap()).unwrap();
        assert_eq!(n1.base(), None);
        assert_eq!(n1.histogram(), BTreeMap::from([('C', 2), ('G', 1)]));
        assert!(n1.distribution().is_none());
    }

    #[test]
    fn test_neighbour_queries() {
        // From column 0: one sequence to column 1, two straight to 3.
        let graph = make_graph(&[(1, "ACGT"), (2, "A--T"), (3, "A--T")]);
        let view = graph.view(graph.focus(NodeId::Pos(0)).unwrap()).unwrap();

        assert_eq!(view.next(NeighbourQuery::default()), vec![NodeId::Pos(1), NodeId::Pos(3)]);
        let by_support = NeighbourQuery {
            by_support: true,
            ..NeighbourQuery::default()
        };
        assert_eq!(view.next(by_support), vec![NodeId::Pos(3), NodeId::Pos(1)]);
        assert_eq!(view.previous(NeighbourQuery::default()), vec![NodeId::Start]);

        let weights = view.next_weights(by_support);
        assert_eq!(weights[0].0, NodeId::Pos(3));
        assert!((weights[0].1 - 2.0 / 3.0).abs() < 1e-9);

        let reciprocated = NeighbourQuery {
            reciprocated_only: true,
            ..NeighbourQuery::default()
        };
        assert!(view.next(reciprocated).is_empty());
    }

    #[test]
    fn test_edits_through_focus() {
        let mut graph = make_graph(&[(1, "AC"), (2, "AG")]);
        let focus = graph.focus(NodeId::Pos(1)).unwrap();

        graph.set_base(focus, 'S').unwrap();
        graph
            .set_distribution(focus, Distribution::categorical([('C', 0.5), ('G', 0.5)]))
            .unwrap();
        graph
            .set_alignment_group(focus, BTreeSet::from([NodeId::Pos(1)]))
            .unwrap();

        let view = graph.view(focus).unwrap();
        assert_eq!(view.base(), Some('S'));
        assert_eq!(view.distribution().map(Distribution::kind), Some("categorical"));

        let start = graph.focus(NodeId::Start).unwrap();
        assert!(matches!(
            graph.set_base(start, 'X'),
            Err(PogError::InvalidSentinelEdit(NodeId::Start))
        ));
    }

    #[test]
    fn test_focus_goes_stale_after_removal() {
        let mut graph = make_graph(&[(1, "ACG")]);
        let focus = graph.focus(NodeId::Pos(1)).unwrap();
        let report = graph.remove_focused(focus, &PogConfig::default()).unwrap();

        assert_eq!(report.removed, vec![NodeId::Pos(1)]);
        assert!(matches!(graph.view(focus), Err(PogError::UnknownNode(_))));
        assert!(graph.focus(NodeId::Pos(7)).is_err());
    }
}
