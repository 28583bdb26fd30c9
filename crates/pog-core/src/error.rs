//! Error types shared by the POG crates.

use crate::ids::{NodeId, SeqId};
use thiserror::Error;

/// Result type alias for POG operations.
pub type Result<T> = std::result::Result<T, PogError>;

/// Everything that can go wrong while building, editing or parsing a graph.
#[derive(Error, Debug)]
pub enum PogError {
    /// An alignment column where every sequence has a gap.
    ///
    /// The caller must strip fully-empty columns before construction.
    #[error("alignment column {column} contains only gaps")]
    EmptyColumn { column: usize },

    /// Sequences in an alignment must all have the same width.
    #[error("sequence {id} has width {found}, expected {expected}")]
    RaggedAlignment {
        id: SeqId,
        expected: usize,
        found: usize,
    },

    #[error("sequence id {id} appears more than once")]
    DuplicateSequence { id: SeqId },

    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),

    #[error("sequence {0} is not registered")]
    UnknownSequence(SeqId),

    /// The sequence's tagged edges end before the virtual end node.
    #[error("sequence {id} cannot be traced past node {at}")]
    IncompleteSequence { id: SeqId, at: NodeId },

    /// The virtual start and end nodes cannot be removed or given content.
    #[error("cannot edit sentinel node {0}")]
    InvalidSentinelEdit(NodeId),

    /// Malformed serialized graph text.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("malformed distribution annotation: {0}")]
    MalformedDistribution(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
