//! Bounded worker pools

use crate::error::{Result, UnprotectError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread;

/// A fixed-size pool that runs a batch of independent units to completion
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Build a pool with at most `budget` threads; `None` lets rayon pick (at least 1)
    pub fn new(name: &'static str, budget: Option<usize>) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(budget.unwrap_or(0))
            .thread_name(move |i| format!("{}-{}", name, i))
            .build()
            .map_err(|e| UnprotectError::Unexpected(format!("failed to start {} pool: {}", name, e)))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `f` once per unit and return one outcome per unit.
    ///
    /// A panic inside `f` is caught and returned as that unit's `Err` payload;
    /// the remaining units still run.
    pub fn run_all<T, R, F>(&self, units: Vec<T>, f: F) -> Vec<(T, std::thread::Result<R>)>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        self.pool.install(|| {
            units
                .into_par_iter()
                .map(|unit| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&unit)));
                    (unit, outcome)
                })
                .collect()
        })
    }
}

/// Dedicated threads that pull units from a shared queue.
///
/// Used for the outer fan-out. Its threads are not rayon workers, so a unit
/// that waits on a [`WorkerPool`] blocks instead of picking up sibling units,
/// and at most `threads` units are ever in flight.
pub struct FileWorkers {
    name: &'static str,
    threads: usize,
}

impl FileWorkers {
    /// `None` uses the available parallelism of the machine (at least 1)
    pub fn new(name: &'static str, budget: Option<usize>) -> Self {
        let threads = budget
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1);
        Self { name, threads }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `f` once per unit and return one outcome per unit, in no particular order.
    ///
    /// Panics are caught per unit exactly as in [`WorkerPool::run_all`].
    pub fn run_all<T, R, F>(&self, units: Vec<T>, f: F) -> Vec<(T, thread::Result<R>)>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let total = units.len();
        let queue = Mutex::new(units.into_iter());
        let results = Mutex::new(Vec::with_capacity(total));

        thread::scope(|scope| {
            for i in 0..self.threads.min(total) {
                let (queue, results, f) = (&queue, &results, &f);
                let worker = thread::Builder::new()
                    .name(format!("{}-{}", self.name, i))
                    .spawn_scoped(scope, move || {
                        loop {
                            let next = queue.lock().unwrap_or_else(|e| e.into_inner()).next();
                            let Some(unit) = next else {
                                break;
                            };
                            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&unit)));
                            results
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .push((unit, outcome));
                        }
                    });
                if let Err(e) = worker {
                    // The threads already running drain the queue
                    log::warn!("Failed to start {} worker {}: {}", self.name, i, e);
                }
            }
        });

        let mut results = results.into_inner().unwrap_or_else(|e| e.into_inner());
        // Every spawn failed: run what is left on the calling thread
        for unit in queue.into_inner().unwrap_or_else(|e| e.into_inner()) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&unit)));
            results.push((unit, outcome));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_every_unit_yields_one_result() {
        let pool = WorkerPool::new("test", Some(3)).unwrap();
        let results = pool.run_all((0..50).collect(), |n: &i32| n * 2);
        assert_eq!(results.len(), 50);
        for (unit, outcome) in results {
            assert_eq!(outcome.unwrap(), unit * 2);
        }
    }

    #[test]
    fn test_panic_is_isolated() {
        let pool = WorkerPool::new("test", Some(2)).unwrap();
        let results = pool.run_all(vec![1, 2, 3, 4], |n: &i32| {
            if *n == 3 {
                panic!("unit three");
            }
            *n
        });

        let failed: Vec<_> = results.iter().filter(|(_, o)| o.is_err()).map(|(u, _)| *u).collect();
        assert_eq!(failed, vec![3]);
        assert_eq!(results.iter().filter(|(_, o)| o.is_ok()).count(), 3);
    }

    #[test]
    fn test_budget_bounds_concurrency() {
        let pool = WorkerPool::new("test", Some(2)).unwrap();
        assert_eq!(pool.threads(), 2);

        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        pool.run_all((0..16).collect(), |_: &i32| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
        });
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_default_budget_has_a_thread() {
        let pool = WorkerPool::new("test", None).unwrap();
        assert!(pool.threads() >= 1);
        assert!(FileWorkers::new("test", None).threads() >= 1);
        assert_eq!(FileWorkers::new("test", Some(0)).threads(), 1);
    }

    #[test]
    fn test_file_workers_yield_one_result_per_unit() {
        let workers = FileWorkers::new("test", Some(3));
        let mut results: Vec<_> = workers
            .run_all((0..20).collect(), |n: &i32| {
                if *n == 7 {
                    panic!("unit seven");
                }
                n * 10
            })
            .into_iter()
            .map(|(unit, outcome)| (unit, outcome.ok()))
            .collect();
        results.sort();

        assert_eq!(results.len(), 20);
        assert_eq!(results[7], (7, None));
        assert_eq!(results[8], (8, Some(80)));
    }

    #[test]
    fn test_outer_budget_holds_while_waiting_on_inner_pool() {
        let files = FileWorkers::new("files", Some(1));
        let sheets = WorkerPool::new("sheets", Some(2)).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let sheet_active = AtomicUsize::new(0);
        let sheet_peak = AtomicUsize::new(0);

        let results = files.run_all((0..8).collect(), |_: &i32| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            sheets.run_all((0..4).collect(), |_: &i32| {
                let now = sheet_active.fetch_add(1, Ordering::SeqCst) + 1;
                sheet_peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(3));
                sheet_active.fetch_sub(1, Ordering::SeqCst);
            });
            active.fetch_sub(1, Ordering::SeqCst);
        });

        assert_eq!(results.len(), 8);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(sheet_peak.load(Ordering::SeqCst) <= 2);
    }
}
