//! POG Graph - Partial order graph engine
//!
//! This crate holds the graph of candidate sequence positions built from
//! a multiple sequence alignment or from indel-transition inference. It
//! provides pruning with path repair, topological ordering, distance
//! queries, consensus extraction and a DOT text format.
//!
//! # Architecture
//!
//! The graph uses petgraph's stable graph as its arena, with additional
//! indexes for:
//! - Node identity lookups (column number or sentinel)
//! - The registry of sequences threaded through the edges
//!
//! # Example
//!
//! ```
//! use pog_core::{AlignedSequence, ConsensusConfig};
//! use pog_graph::PoGraph;
//!
//! let rows = vec![
//!     AlignedSequence::new(1, "a", "ACGT"),
//!     AlignedSequence::new(2, "b", "A--T"),
//!     AlignedSequence::new(3, "c", "A--T"),
//! ];
//! let mut graph = PoGraph::from_alignment(&rows).unwrap();
//!
//! let consensus = graph.consensus(&ConsensusConfig::default());
//! assert_eq!(consensus.sequence, "AT");
//! ```

mod builder;
mod consensus;
mod dot;
mod edge;
mod focus;
mod graph;
mod node;
mod order;
mod prune;

pub use builder::TransitionBuilder;
pub use consensus::Consensus;
pub use edge::Edge;
pub use focus::{Focus, NeighbourQuery, NodeView};
pub use graph::{GraphStats, PoGraph};
pub use node::GraphNode;
pub use prune::Removal;
