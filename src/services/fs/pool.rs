use crate::core::cancel::CancelFlag;
use crate::core::errors::{Error, Result};
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};

/// Fixed-size rayon pool that runs a traversal of jobs spawning follow-up jobs.
///
/// Only the pool's threads run handlers, so at most `workers` directories are
/// open at once no matter how wide or deep the tree is. Built per request.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("diskscope-worker-{i}"))
            .build()
            .map_err(|e| Error::Other(format!("cannot start worker pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `handler` over `seeds` and everything they spawn, returning once
    /// all of it is done.
    ///
    /// Returns `false` when `cancel` was raised; jobs still queued at that
    /// point return without calling `handler`.
    pub fn run<J, F>(&self, seeds: Vec<J>, cancel: &CancelFlag, handler: F) -> bool
    where
        J: Send,
        F: Fn(J) -> Vec<J> + Sync,
    {
        let handler = &handler;
        self.pool.scope(|scope| {
            for seed in seeds {
                spawn_job(scope, seed, cancel, handler);
            }
        });
        !cancel.is_cancelled()
    }
}

fn spawn_job<'s, J, F>(scope: &Scope<'s>, job: J, cancel: &'s CancelFlag, handler: &'s F)
where
    J: Send + 's,
    F: Fn(J) -> Vec<J> + Sync,
{
    scope.spawn(move |scope| {
        if cancel.is_cancelled() {
            return;
        }
        for next in handler(job) {
            spawn_job(scope, next, cancel, handler);
        }
    });
}
