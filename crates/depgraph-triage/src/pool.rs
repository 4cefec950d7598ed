//! Bounded execution for Phase 2.
//!
//! Two layers:
//!
//! - [`run_scoped`] runs the metric tasks, one per enabled metric, on a
//!   fixed number of scoped OS threads. A task is never queued inside
//!   rayon, so no rayon worker can pick it up while waiting on a join.
//! - [`WorkerPool`] is a dedicated `rayon` pool of the configured width.
//!   Only betweenness pivot batches fan out over it (`par_chunks` inside
//!   [`WorkerPool::install`]), so a thread blocked in one of those joins
//!   can only ever steal more pivot batches.
//!
//! Both are bounded by the configured width and neither touches rayon's
//! global pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, warn};

use crate::error::AnalysisError;

#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    width: usize,
}

impl WorkerPool {
    /// Start a pool with `width` threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::WorkerPool`] if the threads cannot be spawned.
    pub fn new(width: usize) -> Result<Self, AnalysisError> {
        let width = width.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|i| format!("depgraph-worker-{i}"))
            .build()
            .map_err(|err| AnalysisError::WorkerPool {
                width,
                reason: err.to_string(),
            })?;
        debug!(width, "worker pool started");
        Ok(Self { pool, width })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Run `op` inside the pool; parallel iterators in `op` use its threads.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

/// Run `task` once per item on at most `width` threads and return the
/// results in item order.
///
/// The calling thread is one of the workers; the rest are scoped threads
/// that pull the next unclaimed item until none are left. A thread that
/// cannot be started is logged and its share goes to the others. A slot is
/// `None` only if the thread running that item panicked.
pub fn run_scoped<T, R, F>(items: &[T], width: usize, task: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let next = AtomicUsize::new(0);
    let work = || {
        let mut done = Vec::new();
        loop {
            let i = next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(i) else {
                break;
            };
            done.push((i, task(item)));
        }
        done
    };

    let threads = width.clamp(1, items.len().max(1));
    let finished = thread::scope(|scope| {
        let handles: Vec<_> = (1..threads)
            .filter_map(|i| {
                thread::Builder::new()
                    .name(format!("depgraph-task-{i}"))
                    .spawn_scoped(scope, work)
                    .map_err(|err| warn!(%err, "task thread not started"))
                    .ok()
            })
            .collect();

        let mut finished = work();
        for handle in handles {
            match handle.join() {
                Ok(mut done) => finished.append(&mut done),
                Err(_) => warn!("task thread panicked"),
            }
        }
        finished
    });

    let mut results: Vec<Option<R>> = items.iter().map(|_| None).collect();
    for (i, result) in finished {
        results[i] = Some(result);
    }
    results
}
