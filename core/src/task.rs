//! CPU task pool for fan-out work.
//!
//! [`TaskPool`] distributes independent jobs over OS threads via
//! `std::thread::scope`. Every entry point joins all spawned work before
//! returning, so callers never observe a partially finished batch. "Waiting"
//! here is an explicit join, not a scheduler-visible suspension point.
//!
//! Two shapes of fan-out are provided:
//!
//! - [`TaskPool::run_all`]: run a batch of heterogeneous jobs, collecting
//!   their results in submission order. Used to record independent render
//!   passes concurrently.
//! - [`TaskPool::parallel_for`]: chunked index-range fan-out for large
//!   homogeneous workloads (e.g. per-draw-call descriptor binding inside a
//!   single pass).

use std::collections::VecDeque;
use std::sync::Mutex;

/// A pool of worker threads for joined fan-out work.
///
/// The pool stores only a thread count; threads are scoped to each call,
/// so no worker outlives the work it was spawned for.
#[derive(Debug, Clone)]
pub struct TaskPool {
    num_threads: usize,
}

impl TaskPool {
    /// Create a pool with the specified thread count (minimum 1).
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }

    /// Create a pool sized to the machine's available parallelism.
    pub fn with_default_threads() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        log::debug!("TaskPool: using {threads} worker threads");
        Self::new(threads)
    }

    /// Returns the configured thread count.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run all jobs to completion, returning their results in submission
    /// order.
    ///
    /// Jobs are pulled from a shared queue by up to `num_threads` workers.
    /// A single job (or a single-threaded pool) runs inline on the calling
    /// thread with no spawn overhead.
    pub fn run_all<T, F>(&self, jobs: Vec<F>) -> Vec<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        if jobs.is_empty() {
            return Vec::new();
        }

        if self.num_threads == 1 || jobs.len() == 1 {
            return jobs.into_iter().map(|job| job()).collect();
        }

        let count = jobs.len();
        let queue: Mutex<VecDeque<(usize, F)>> =
            Mutex::new(jobs.into_iter().enumerate().collect());
        let results: Mutex<Vec<Option<T>>> =
            Mutex::new((0..count).map(|_| None).collect());

        let workers = self.num_threads.min(count);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue.lock().unwrap().pop_front();
                    let Some((index, job)) = next else {
                        break;
                    };
                    let result = job();
                    results.lock().unwrap()[index] = Some(result);
                });
            }
        });

        results
            .into_inner()
            .unwrap()
            .into_iter()
            .map(|slot| slot.expect("worker completed every job"))
            .collect()
    }

    /// Run `body` over `[start, end)` in chunks of `chunk_size`, joining all
    /// chunks before returning.
    ///
    /// `chunk_size` of 0 is treated as 1. The body receives half-open index
    /// ranges and must not assume any particular chunk order.
    pub fn parallel_for<F>(&self, start: usize, end: usize, chunk_size: usize, body: F)
    where
        F: Fn(std::ops::Range<usize>) + Sync,
    {
        if start >= end {
            return;
        }

        let chunk_size = chunk_size.max(1);
        let mut chunks: VecDeque<std::ops::Range<usize>> = VecDeque::new();
        let mut cursor = start;
        while cursor < end {
            let chunk_end = (cursor + chunk_size).min(end);
            chunks.push_back(cursor..chunk_end);
            cursor = chunk_end;
        }

        if self.num_threads == 1 || chunks.len() == 1 {
            for chunk in chunks {
                body(chunk);
            }
            return;
        }

        let workers = self.num_threads.min(chunks.len());
        let queue = Mutex::new(chunks);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue.lock().unwrap().pop_front();
                    let Some(chunk) = next else {
                        break;
                    };
                    body(chunk);
                });
            }
        });
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::with_default_threads()
    }
}
