//! Aligned input sequences.

use crate::ids::SeqId;
use serde::{Deserialize, Serialize};

/// Character used for alignment gaps.
pub const GAP: char = '-';

/// Returns true if `c` marks a gap in an alignment row.
pub fn is_gap(c: char) -> bool {
    c == GAP || c == '.'
}

/// One row of a multiple sequence alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedSequence {
    /// Stable identifier, used to tag edges.
    pub id: SeqId,
    /// Human-readable name (e.g. the FASTA header).
    pub label: String,
    /// Gapped characters, one per alignment column.
    pub chars: Vec<char>,
}

impl AlignedSequence {
    /// Creates an aligned row from a gapped string.
    pub fn new(id: SeqId, label: impl Into<String>, gapped: &str) -> Self {
        Self {
            id,
            label: label.into(),
            chars: gapped.chars().collect(),
        }
    }

    /// Number of alignment columns in this row.
    pub fn width(&self) -> usize {
        self.chars.len()
    }

    /// The row with gaps removed.
    pub fn ungapped(&self) -> String {
        self.chars.iter().filter(|c| !is_gap(**c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ungapped() {
        let row = AlignedSequence::new(3, "seq3", "A-C.G");
        assert_eq!(row.width(), 5);
        assert_eq!(row.ungapped(), "ACG");
    }
}
