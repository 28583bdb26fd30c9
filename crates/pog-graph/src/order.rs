//! Topological ordering and path queries.
//!
//! Indel histories produce diamonds (a split that later remerges), so a
//! graph usually has several valid linear extensions. `topological_order`
//! returns one of them; callers must not depend on which.

use crate::graph::PoGraph;
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use pog_core::{NodeId, Result};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Started,
    Completed,
}

impl PoGraph {
    /// Returns every node id in a valid topological order.
    ///
    /// Depth-first post-order with an explicit stack, so graph size is
    /// not limited by call depth. Each node is pushed, then on first pop
    /// marked started and re-pushed beneath its unfinished successors; on
    /// second pop it is complete.
    pub fn topological_order(&self) -> Vec<NodeId> {
        self.topological_indices()
            .into_iter()
            .map(|index| self.graph[index].id)
            .collect()
    }

    pub(crate) fn topological_indices(&self) -> Vec<NodeIndex> {
        let mut marks: HashMap<NodeIndex, Mark> = HashMap::with_capacity(self.graph.node_count());
        let mut postorder: Vec<NodeIndex> = Vec::with_capacity(self.graph.node_count());
        let mut stack: Vec<NodeIndex> = Vec::new();

        // Start first so it heads the order; the rest catch anything the
        // start node cannot reach.
        let start = self.start_index();
        let roots = std::iter::once(start).chain(self.graph.node_indices().filter(|i| *i != start));

        for root in roots {
            if marks.contains_key(&root) {
                continue;
            }
            stack.push(root);

            while let Some(index) = stack.pop() {
                match marks.get(&index) {
                    Some(Mark::Completed) => {}
                    Some(Mark::Started) => {
                        marks.insert(index, Mark::Completed);
                        postorder.push(index);
                    }
                    None => {
                        marks.insert(index, Mark::Started);
                        stack.push(index);
                        for (_, succ) in self.edges_of(index, Direction::Outgoing).into_iter().rev() {
                            if !marks.contains_key(&succ) {
                                stack.push(succ);
                            }
                        }
                    }
                }
            }
        }

        postorder.reverse();
        postorder
    }

    /// Position of each node in `topological_order`.
    pub fn topological_ranks(&self) -> HashMap<NodeId, usize> {
        self.topological_order()
            .into_iter()
            .enumerate()
            .map(|(rank, id)| (id, rank))
            .collect()
    }

    /// Minimum hop count from `from` to every node reachable from it.
    ///
    /// Relaxes edges in topological order, which on an unweighted DAG is
    /// the same as breadth-first layering.
    pub fn distances_from(&self, from: NodeId) -> Result<BTreeMap<NodeId, usize>> {
        let source = self.index_of(from)?;
        let mut dist: HashMap<NodeIndex, usize> = HashMap::new();
        dist.insert(source, 0);

        for index in self.topological_indices() {
            let Some(&d) = dist.get(&index) else { continue };
            for (_, succ) in self.edges_of(index, Direction::Outgoing) {
                let entry = dist.entry(succ).or_insert(usize::MAX);
                *entry = (*entry).min(d + 1);
            }
        }

        Ok(dist
            .into_iter()
            .map(|(index, d)| (self.graph[index].id, d))
            .collect())
    }

    /// Fewest-hop path from `from` to `to`, both included.
    ///
    /// Breadth-first over successors. A candidate step is pruned if it
    /// revisits a node, enters a node in `exclude`, or leaves the
    /// topological rank window between the two endpoints. Returns `None`
    /// once the frontier is exhausted without reaching `to`.
    pub fn shortest_path(
        &self,
        from: NodeId,
        to: NodeId,
        exclude: &HashSet<NodeId>,
    ) -> Result<Option<Vec<NodeId>>> {
        let source = self.index_of(from)?;
        let target = self.index_of(to)?;

        if source == target {
            return Ok(Some(vec![from]));
        }

        let ranks: HashMap<NodeIndex, usize> = self
            .topological_indices()
            .into_iter()
            .enumerate()
            .map(|(rank, index)| (index, rank))
            .collect();
        let (low, high) = (ranks[&source], ranks[&target]);
        if low > high {
            return Ok(None);
        }

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([source]);
        let mut queue: VecDeque<NodeIndex> = VecDeque::from([source]);

        while let Some(current) = queue.pop_front() {
            for (_, succ) in self.edges_of(current, Direction::Outgoing) {
                let rank = ranks[&succ];
                if rank > high
                    || rank < low
                    || visited.contains(&succ)
                    || exclude.contains(&self.graph[succ].id)
                {
                    continue;
                }
                visited.insert(succ);
                parent.insert(succ, current);

                if succ == target {
                    let mut path = vec![self.graph[target].id];
                    let mut step = target;
                    while let Some(&prev) = parent.get(&step) {
                        path.push(self.graph[prev].id);
                        step = prev;
                    }
                    path.reverse();
                    return Ok(Some(path));
                }
                queue.push_back(succ);
            }
        }

        Ok(None)
    }
}
