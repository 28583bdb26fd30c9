//! POG Core - Shared types for partial order graph reconstruction
//!
//! This crate holds the plain data that flows into and out of the graph
//! engine: node and sequence identities, aligned input rows, indel
//! inference records, character-state distributions, configuration and
//! errors. It has no graph logic of its own.
//!
//! # Example
//!
//! ```
//! use pog_core::{AlignedSequence, NodeId};
//!
//! let row = AlignedSequence::new(1, "seqA", "A-C");
//! assert_eq!(row.ungapped(), "AC");
//! assert!(NodeId::Start < NodeId::Pos(0));
//! ```

mod alignment;
mod config;
mod distribution;
mod error;
mod ids;
mod inference;

pub use alignment::{is_gap, AlignedSequence, GAP};
pub use config::{ConsensusConfig, DotConfig, PogConfig};
pub use distribution::{Distribution, GaussianComponent};
pub use error::{PogError, Result};
pub use ids::{NodeId, SeqId};
pub use inference::{Residue, TransitionRecord};
