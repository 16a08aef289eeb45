//! Semaphore contention scenario.
//!
//! A pool of named worker threads shares a small set of binary semaphores.
//! Worker `i` is bound to lock `i % locks` and, for a fixed number of cycles,
//! acquires it, holds it for one tick, releases it and idles for one tick.
//! With more workers than locks, most of them spend most of the scenario
//! queued in `acquire`.
//!
//! Each worker only ever holds one lock, so the scenario cannot deadlock.

use std::io;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, Builder, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{CompletionMode, ContentionConfig};
use crate::error::Error;
use crate::report::{ContentionReport, LockReport, WorkerReport};
use crate::semaphore::CountingSemaphore;
use crate::Result;

/// Counters kept alongside each lock
#[derive(Debug, Default)]
pub struct LockStats {
    holders: AtomicUsize,
    peak_holders: AtomicUsize,
    acquisitions: AtomicU64,
}

impl LockStats {
    fn enter(&self) {
        let holders = self.holders.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_holders.fetch_max(holders, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn peak_holders(&self) -> usize {
        self.peak_holders.load(Ordering::SeqCst)
    }
}

/// One binary semaphore and its counters
#[derive(Debug)]
pub struct SharedLock {
    semaphore: CountingSemaphore,
    stats: LockStats,
}

impl SharedLock {
    fn new() -> Self {
        Self {
            semaphore: CountingSemaphore::binary(),
            stats: LockStats::default(),
        }
    }

    pub fn semaphore(&self) -> &CountingSemaphore {
        &self.semaphore
    }

    pub fn stats(&self) -> &LockStats {
        &self.stats
    }
}

/// Locks shared by every worker of the scenario
#[derive(Debug)]
pub struct LockSet {
    locks: Vec<SharedLock>,
}

impl LockSet {
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SharedLock> {
        self.locks.get(index)
    }

    fn reports(&self) -> Vec<LockReport> {
        self.locks
            .iter()
            .enumerate()
            .map(|(index, lock)| LockReport {
                index,
                acquisitions: lock.stats.acquisitions(),
                peak_holders: lock.stats.peak_holders(),
            })
            .collect()
    }
}

/// Create `count` semaphores, each with a single permit.
pub fn init_locks(count: usize) -> Arc<LockSet> {
    debug!("Initializing {} binary semaphores", count);
    Arc::new(LockSet {
        locks: (0..count).map(|_| SharedLock::new()).collect(),
    })
}

/// Progress of one worker, readable while it runs
#[derive(Debug)]
pub struct WorkerState {
    index: usize,
    lock: usize,
    cycles: AtomicU32,
}

impl WorkerState {
    fn report(&self) -> WorkerReport {
        WorkerReport {
            index: self.index,
            lock: self.lock,
            cycles: self.cycles.load(Ordering::SeqCst),
        }
    }
}

/// A spawned worker thread
#[derive(Debug)]
pub struct Worker {
    state: Arc<WorkerState>,
    handle: JoinHandle<()>,
}

impl Worker {
    pub fn index(&self) -> usize {
        self.state.index
    }

    pub fn lock(&self) -> usize {
        self.state.lock
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Acquire, hold for one tick, release, idle for one tick; `cycles` times.
///
/// Completed cycles are counted into `completed` as they finish.
pub fn worker_loop(lock: &SharedLock, cycles: u32, tick: Duration, completed: &AtomicU32) {
    for _ in 0..cycles {
        let permit = lock.semaphore.acquire();
        lock.stats.enter();
        thread::sleep(tick);
        lock.stats.exit();
        drop(permit);

        thread::sleep(tick);
        completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Body handed to a worker thread.
pub type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// Start `config.workers` threads, worker `i` bound to lock `i % config.locks`.
///
/// Stops at the first thread that cannot be created. Workers already running
/// at that point are detached and keep going.
pub fn spawn_workers(config: &ContentionConfig, locks: &Arc<LockSet>) -> Result<Vec<Worker>> {
    spawn_workers_with(config, locks, |builder, body| builder.spawn(body))
}

/// [`spawn_workers`] with thread creation delegated to `spawn`.
pub fn spawn_workers_with<S>(
    config: &ContentionConfig,
    locks: &Arc<LockSet>,
    mut spawn: S,
) -> Result<Vec<Worker>>
where
    S: FnMut(Builder, WorkerBody) -> io::Result<JoinHandle<()>>,
{
    let mut workers = Vec::with_capacity(config.workers);

    for index in 0..config.workers {
        let state = Arc::new(WorkerState {
            index,
            lock: config.lock_for(index),
            cycles: AtomicU32::new(0),
        });

        let handle = {
            let state = Arc::clone(&state);
            let locks = Arc::clone(locks);
            let cycles = config.cycles;
            let tick = config.tick;
            let builder = Builder::new().name(format!("sem-worker-{}", index));
            let body: WorkerBody = Box::new(move || {
                if let Some(lock) = locks.get(state.lock) {
                    worker_loop(lock, cycles, tick, &state.cycles);
                }
            });
            spawn(builder, body)
                .map_err(|source| Error::WorkerSpawnFailed { index, source })?
        };

        debug!("Spawned worker {} on lock {}", index, state.lock);
        workers.push(Worker { state, handle });
    }

    Ok(workers)
}

/// Run the whole contention scenario and report what the workers did.
pub fn run_contention_scenario(config: &ContentionConfig) -> Result<ContentionReport> {
    config.validate()?;
    info!(
        "Starting {} workers over {} locks, {} cycles of {:?}",
        config.workers, config.locks, config.cycles, config.tick
    );

    let locks = init_locks(config.locks);
    let workers = spawn_workers(config, &locks)?;

    let (states, finished_workers) = match config.completion {
        CompletionMode::Join => {
            let mut states = Vec::with_capacity(workers.len());
            for worker in workers {
                let index = worker.state.index;
                worker.handle.join().map_err(|_| Error::PeerFailed {
                    role: "worker",
                    detail: format!("worker {} panicked", index),
                })?;
                states.push(worker.state);
            }
            let finished = states.len();
            (states, finished)
        }
        CompletionMode::TimedWait { ticks } => {
            thread::sleep(config.tick.saturating_mul(ticks));
            let finished = workers.iter().filter(|w| w.is_finished()).count();
            if finished < workers.len() {
                warn!(
                    "Timed wait elapsed with {} of {} workers still running",
                    workers.len() - finished,
                    workers.len()
                );
            }
            // Unfinished workers are left detached.
            let states = workers.into_iter().map(|w| w.state).collect();
            (states, finished)
        }
    };

    let report = ContentionReport {
        completion: config.completion,
        workers: states.iter().map(|state| state.report()).collect(),
        locks: locks.reports(),
        finished_workers,
    };
    info!(
        "Contention finished: {} acquisitions, {}/{} workers done",
        report.total_acquisitions(),
        report.finished_workers,
        report.workers.len()
    );
    Ok(report)
}
