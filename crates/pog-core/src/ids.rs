//! Node and sequence identities.

use crate::error::PogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of an input sequence.
pub type SeqId = u32;

/// Identity of a graph node.
///
/// Real nodes are numbered by alignment column. The two sentinels bound
/// every path; the derived ordering places `Start` before every real
/// node and `End` after every real node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Virtual start node. Has no predecessors.
    Start,
    /// A real position, numbered by its original alignment column.
    Pos(usize),
    /// Virtual end node. Has no successors.
    End,
}

impl NodeId {
    /// Returns true for the virtual start and end nodes.
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, NodeId::Pos(_))
    }

    /// The alignment column of a real node.
    pub fn column(&self) -> Option<usize> {
        match self {
            NodeId::Pos(column) => Some(*column),
            _ => None,
        }
    }
}

impl From<usize> for NodeId {
    fn from(column: usize) -> Self {
        NodeId::Pos(column)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Start => write!(f, "start"),
            NodeId::Pos(column) => write!(f, "{}", column),
            NodeId::End => write!(f, "end"),
        }
    }
}

impl FromStr for NodeId {
    type Err = PogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(NodeId::Start),
            "end" => Ok(NodeId::End),
            other => other.parse::<usize>().map(NodeId::Pos).map_err(|_| PogError::Parse {
                line: 0,
                message: format!("invalid node identifier '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_bound_real_nodes() {
        assert!(NodeId::Start < NodeId::Pos(0));
        assert!(NodeId::Pos(0) < NodeId::Pos(7));
        assert!(NodeId::Pos(usize::MAX) < NodeId::End);
    }

    #[test]
    fn test_display_parse() {
        for id in [NodeId::Start, NodeId::Pos(42), NodeId::End] {
            let parsed: NodeId = id.to_string().parse().unwrap();
            assert_eq!(parsed, id);
        }
        assert!("x12".parse::<NodeId>().is_err());
        assert!("-3".parse::<NodeId>().is_err());
    }
}
