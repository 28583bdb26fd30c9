//! Records produced by the indel-transition inference step.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The inferred state of one position in an ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residue {
    /// The ancestor has this character at the position.
    Base(char),
    /// The ancestor lacks the position entirely.
    Absent,
}

/// One position of an inferred ancestor and the positions it links to.
///
/// Records for `NodeId::Start` or `NodeId::End` contribute transitions
/// only; their residue is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub position: NodeId,
    pub residue: Residue,
    /// Positions this one is linked to, in either direction.
    pub targets: BTreeSet<NodeId>,
}

impl TransitionRecord {
    pub fn new(
        position: impl Into<NodeId>,
        residue: Residue,
        targets: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            position: position.into(),
            residue,
            targets: targets.into_iter().collect(),
        }
    }

    /// Returns true if the position is excluded from the ancestor.
    pub fn is_absent(&self) -> bool {
        !self.position.is_sentinel() && self.residue == Residue::Absent
    }
}
