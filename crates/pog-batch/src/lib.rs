//! POG Batch - Fixed-size worker pool for independent graph jobs
//!
//! Reconstruction often builds one graph per ancestor or per input file.
//! Those jobs share nothing, so they run in parallel on a bounded set of
//! worker threads. A job that fails or panics is logged and recorded;
//! the rest of the batch carries on.
//!
//! # Example
//!
//! ```
//! use pog_batch::run_batch;
//! use pog_core::PogConfig;
//!
//! let jobs: Vec<_> = (0..4)
//!     .map(|n| move || -> Result<usize, String> { Ok(n * n) })
//!     .collect();
//! let config = PogConfig { threads: 2, ..PogConfig::default() };
//! let outcome = run_batch(jobs, &config).unwrap();
//! assert_eq!(outcome.results.get(&3), Some(&9));
//! assert!(outcome.failures.is_empty());
//! ```

use pog_core::PogConfig;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, info};

/// Errors that stop a batch from running at all.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to start worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// What came back from a batch, keyed by each job's position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub results: BTreeMap<usize, T>,
    pub failures: BTreeMap<usize, String>,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            results: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    /// Total number of jobs accounted for.
    pub fn len(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs every job on a fresh runtime with `config.threads` workers (at
/// least one).
///
/// Blocks until all jobs have finished.
pub fn run_batch<J, T, E>(jobs: Vec<J>, config: &PogConfig) -> Result<BatchOutcome<T>, BatchError>
where
    J: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads.max(1))
        .thread_name("pog-worker")
        .build()?;

    Ok(runtime.block_on(run_jobs(jobs)))
}

/// Runs every job as a task on the current runtime.
pub async fn run_jobs<J, T, E>(jobs: Vec<J>) -> BatchOutcome<T>
where
    J: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| tokio::spawn(async move { job() }))
        .collect();

    let mut outcome = BatchOutcome::new();
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(value)) => {
                outcome.results.insert(index, value);
            }
            Ok(Err(e)) => {
                error!("Job {} failed: {}", index, e);
                outcome.failures.insert(index, e.to_string());
            }
            Err(e) => {
                let reason = join_failure(e);
                error!("Job {} aborted: {}", index, reason);
                outcome.failures.insert(index, reason);
            }
        }
    }

    info!(
        "Batch finished: {} succeeded, {} failed",
        outcome.results.len(),
        outcome.failures.len()
    );
    outcome
}

fn join_failure(e: JoinError) -> String {
    if e.is_panic() {
        format!("panicked: {}", panic_message(e.into_panic()))
    } else {
        e.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
