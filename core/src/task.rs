use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("failed to start worker pool")]
    Spawn(#[from] rayon::ThreadPoolBuildError),
}

/// A failed task together with the item that produced it. When several
/// tasks of one batch fail, the earliest in submission order is reported.
#[derive(Error, Debug)]
#[error("processing '{item}' failed")]
pub struct TaskFailure<I, E>
where
    I: fmt::Display + fmt::Debug,
    E: std::error::Error + 'static,
{
    pub item: I,
    #[source]
    pub source: E,
}

/// Bounded worker pool that preserves submission order in its results.
///
/// Each pool is local to its instance; separate batches never share
/// threads or steal work from one another.
#[derive(Debug)]
pub struct TaskPool {
    pool: ThreadPool,
    workers: usize,
}

impl TaskPool {
    /// Build a pool with `max(1, workers)` threads.
    pub fn new(workers: usize) -> Result<Self, TaskError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `op` over every item and return `(item, output)` pairs in the
    /// order the items were submitted, independent of completion order.
    /// With one worker the results match sequential execution.
    ///
    /// The whole batch runs to completion even when tasks fail; there is no
    /// mid-batch cancellation. Afterwards the first failure in submission
    /// order is returned with its originating item attached, ties by
    /// completion time do not matter. No result is silently dropped: every
    /// submitted item ends up in the output pairs or in the one reported
    /// failure.
    pub fn run<I, T, E, F>(&self, items: Vec<I>, op: F) -> Result<Vec<(I, T)>, TaskFailure<I, E>>
    where
        I: Send + Sync + fmt::Display + fmt::Debug,
        T: Send,
        E: std::error::Error + Send + 'static,
        F: Fn(&I) -> Result<T, E> + Send + Sync,
    {
        debug!(batch = items.len(), workers = self.workers, "running batch");
        let outputs: Vec<Result<T, E>> = self
            .pool
            .install(|| items.par_iter().map(|item| op(item)).collect());

        let mut pairs = Vec::with_capacity(items.len());
        for (item, output) in items.into_iter().zip(outputs) {
            match output {
                Ok(output) => pairs.push((item, output)),
                Err(source) => return Err(TaskFailure { item, source }),
            }
        }
        Ok(pairs)
    }
}
