//! Node records for the partial order graph.

use pog_core::{Distribution, NodeId, SeqId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A candidate sequence position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,

    /// Character resolved for this position, if any.
    pub base: Option<char>,

    /// Character each sequence contributes here.
    pub seq_chars: BTreeMap<SeqId, char>,

    /// Nodes that are mutually exclusive alternatives at the same rank.
    pub alignment_group: Option<BTreeSet<NodeId>>,

    /// State distribution from ancestral inference.
    pub distribution: Option<Distribution>,

    /// Set when the node lies on the last extracted consensus path.
    pub consensus: bool,
}

impl GraphNode {
    /// Creates an empty node.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            base: None,
            seq_chars: BTreeMap::new(),
            alignment_group: None,
            distribution: None,
            consensus: false,
        }
    }

    /// Creates a node from the characters sequences contribute to it.
    ///
    /// The base is resolved only when every contributor agrees.
    pub fn with_chars(id: NodeId, seq_chars: BTreeMap<SeqId, char>) -> Self {
        let mut node = Self::new(id);
        node.seq_chars = seq_chars;
        node.base = node.unanimous_char();
        node
    }

    /// The single character shared by all contributors, if there is one.
    pub fn unanimous_char(&self) -> Option<char> {
        let mut chars = self.seq_chars.values();
        let first = *chars.next()?;
        chars.all(|c| *c == first).then_some(first)
    }

    /// Count of each contributed character.
    pub fn histogram(&self) -> BTreeMap<char, usize> {
        let mut counts = BTreeMap::new();
        for c in self.seq_chars.values() {
            *counts.entry(*c).or_insert(0) += 1;
        }
        counts
    }

    /// Best character to display for this node.
    ///
    /// Prefers the resolved base, then the distribution's most likely
    /// character, then the most common contributed character (smallest
    /// character on ties).
    pub fn display_char(&self) -> Option<char> {
        if let Some(base) = self.base {
            return Some(base);
        }
        if let Some(c) = self.distribution.as_ref().and_then(Distribution::most_likely) {
            return Some(c);
        }
        self.histogram()
            .into_iter()
            .fold(None, |best: Option<(char, usize)>, (c, n)| match best {
                Some((_, bn)) if bn >= n => best,
                _ => Some((c, n)),
            })
            .map(|(c, _)| c)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.id, self.display_char()) {
            (NodeId::Pos(_), Some(c)) => write!(f, "{}", c),
            (id, _) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(pairs: &[(SeqId, char)]) -> BTreeMap<SeqId, char> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_unanimous_base() {
        let node = GraphNode::with_chars(NodeId::Pos(0), chars(&[(1, 'A'), (2, 'A')]));
        assert_eq!(node.base, Some('A'));
    }

    #[test]
    fn test_mixed_column_unresolved() {
        let node = GraphNode::with_chars(NodeId::Pos(1), chars(&[(1, 'C'), (2, 'G'), (3, 'C')]));
        assert_eq!(node.base, None);

        let hist = node.histogram();
        assert_eq!(hist.get(&'C'), Some(&2));
        assert_eq!(hist.get(&'G'), Some(&1));
        assert_eq!(node.display_char(), Some('C'));
    }

    #[test]
    fn test_distribution_beats_histogram() {
        let mut node = GraphNode::with_chars(NodeId::Pos(1), chars(&[(1, 'C'), (2, 'G'), (3, 'C')]));
        node.distribution = Some(Distribution::categorical([('C', 0.1), ('G', 0.9)]));
        assert_eq!(node.display_char(), Some('G'));
    }

    #[test]
    fn test_empty_node_has_no_char() {
        assert_eq!(GraphNode::new(NodeId::Start).display_char(), None);
    }
}
