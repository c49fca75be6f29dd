//! Bounded worker pool for independent, side-effect-free tasks.
//!
//! Jobs go out over one channel and workers report `Started` / `Finished`
//! events over another; the calling thread alone owns the outcome table, so
//! no result state is shared between threads. Each task gets its own
//! deadline, measured from the moment a worker picks it up. A task that
//! misses it is settled as [`TaskOutcome::TimedOut`], its worker is retired
//! (it exits once the stuck call returns, and its late result is dropped) and
//! a fresh worker takes its place so the pool keeps its width.
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("all workers exited with {pending} task(s) unsettled")]
    Disconnected { pending: usize },
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    /// Per-task limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Prefix of worker thread names.
    pub name: String,
}

impl PoolConfig {
    pub fn new(workers: usize, timeout: Option<Duration>) -> Self {
        Self {
            workers,
            timeout,
            name: "pool".to_string(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<O> {
    Completed(O),
    TimedOut { limit: Duration },
    /// The task was still queued when shutdown or abort was requested.
    Cancelled,
    Panicked { message: String },
}

impl<O> TaskOutcome<O> {
    pub fn completed(self) -> Option<O> {
        match self {
            Self::Completed(output) => Some(output),
            _ => None,
        }
    }
}

/// Result of [`TaskPool::run_until`].
#[derive(Debug)]
pub enum PoolRun<O> {
    /// One outcome per job, in submission order.
    Finished(Vec<TaskOutcome<O>>),
    /// The abort predicate accepted the output of job `index`.
    Aborted { index: usize, output: O },
}

/// Stops a running pool from starting queued tasks. Tasks already running
/// are left to finish or time out.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct TaskPool {
    config: PoolConfig,
    shutdown: ShutdownHandle,
}

enum Event<O> {
    Started {
        index: usize,
        worker: usize,
        at: Instant,
    },
    Finished {
        index: usize,
        result: Result<O, String>,
    },
    Skipped {
        index: usize,
    },
}

struct Worker {
    retired: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

struct Running {
    worker: usize,
    deadline: Option<Instant>,
}

impl TaskPool {
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        Ok(Self {
            config,
            shutdown: ShutdownHandle::default(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs every job and returns one outcome per job in submission order.
    pub fn run<J, O, F>(&self, jobs: Vec<J>, work: F) -> Result<Vec<TaskOutcome<O>>, PoolError>
    where
        J: Send + 'static,
        O: Send + 'static,
        F: Fn(J) -> O + Send + Sync + 'static,
    {
        match self.run_until(jobs, work, |_| false)? {
            PoolRun::Finished(outcomes) => Ok(outcomes),
            PoolRun::Aborted { .. } => unreachable!("predicate never aborts"),
        }
    }

    /// Like [`TaskPool::run`], but stops as soon as `abort` accepts a
    /// completed output. Queued tasks are then dropped and running ones are
    /// left detached.
    pub fn run_until<J, O, F, A>(
        &self,
        jobs: Vec<J>,
        work: F,
        abort: A,
    ) -> Result<PoolRun<O>, PoolError>
    where
        J: Send + 'static,
        O: Send + 'static,
        F: Fn(J) -> O + Send + Sync + 'static,
        A: Fn(&O) -> bool,
    {
        let total = jobs.len();
        if total == 0 {
            return Ok(PoolRun::Finished(Vec::new()));
        }

        let (job_tx, job_rx) = unbounded::<(usize, J)>();
        let (event_tx, event_rx) = unbounded::<Event<O>>();
        for job in jobs.into_iter().enumerate() {
            // The receiver is alive until the workers below exit.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let stop = Arc::new(AtomicBool::new(false));
        let work = Arc::new(work);
        let spawn = |id: usize| -> Result<Worker, PoolError> {
            let retired = Arc::new(AtomicBool::new(false));
            let handle = thread::Builder::new()
                .name(format!("{}-{id}", self.config.name))
                .spawn({
                    let jobs = job_rx.clone();
                    let events = event_tx.clone();
                    let work = Arc::clone(&work);
                    let retired = Arc::clone(&retired);
                    let shutdown = self.shutdown.clone();
                    let stop = Arc::clone(&stop);
                    move || worker_loop(id, jobs, events, work, retired, shutdown, stop)
                })
                .map_err(PoolError::Spawn)?;
            Ok(Worker {
                retired,
                handle: Some(handle),
            })
        };

        let width = self.config.workers.min(total);
        let mut workers = Vec::with_capacity(width);
        for id in 0..width {
            workers.push(spawn(id)?);
        }
        debug!(pool = %self.config.name, workers = width, tasks = total, "pool started");

        let mut outcomes: Vec<Option<TaskOutcome<O>>> = (0..total).map(|_| None).collect();
        let mut running: HashMap<usize, Running> = HashMap::new();
        let mut settled = 0usize;

        while settled < total {
            let next = running.values().filter_map(|task| task.deadline).min();
            let event = match next {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    event_rx.recv_timeout(wait)
                }
                None => event_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match event {
                Ok(Event::Started { index, worker, at }) => {
                    trace!(index, worker, "task started");
                    let deadline = self.config.timeout.map(|limit| at + limit);
                    running.insert(index, Running { worker, deadline });
                }
                Ok(Event::Finished { index, result }) => {
                    if running.remove(&index).is_none() && outcomes[index].is_some() {
                        debug!(index, "discarding result of settled task");
                        continue;
                    }
                    let outcome = match result {
                        Ok(output) if abort(&output) => {
                            stop.store(true, Ordering::SeqCst);
                            warn!(pool = %self.config.name, index, "pool aborted");
                            return Ok(PoolRun::Aborted { index, output });
                        }
                        Ok(output) => TaskOutcome::Completed(output),
                        Err(message) => {
                            warn!(index, %message, "task panicked");
                            TaskOutcome::Panicked { message }
                        }
                    };
                    outcomes[index] = Some(outcome);
                    settled += 1;
                }
                Ok(Event::Skipped { index }) => {
                    outcomes[index] = Some(TaskOutcome::Cancelled);
                    settled += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    let expired: Vec<usize> = running
                        .iter()
                        .filter(|(_, task)| task.deadline.is_some_and(|at| at <= now))
                        .map(|(index, _)| *index)
                        .collect();
                    for index in expired {
                        let Some(task) = running.remove(&index) else {
                            continue;
                        };
                        let limit = self.config.timeout.unwrap_or_default();
                        warn!(
                            pool = %self.config.name,
                            index,
                            limit = %humanize(limit),
                            "task timed out; replacing worker"
                        );
                        workers[task.worker].retired.store(true, Ordering::SeqCst);
                        // Stuck workers are never joined.
                        workers[task.worker].handle = None;
                        outcomes[index] = Some(TaskOutcome::TimedOut { limit });
                        settled += 1;
                        if settled < total {
                            let id = workers.len();
                            workers.push(spawn(id)?);
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(PoolError::Disconnected {
                        pending: total - settled,
                    });
                }
            }
        }

        drop(event_rx);
        for worker in &mut workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
        debug!(pool = %self.config.name, tasks = total, "pool drained");

        Ok(PoolRun::Finished(
            outcomes
                .into_iter()
                .map(|outcome| outcome.unwrap_or(TaskOutcome::Cancelled))
                .collect(),
        ))
    }
}

fn worker_loop<J, O, F>(
    id: usize,
    jobs: Receiver<(usize, J)>,
    events: Sender<Event<O>>,
    work: Arc<F>,
    retired: Arc<AtomicBool>,
    shutdown: ShutdownHandle,
    stop: Arc<AtomicBool>,
) where
    F: Fn(J) -> O,
{
    for (index, job) in jobs.iter() {
        if shutdown.is_requested() || stop.load(Ordering::SeqCst) {
            if events.send(Event::Skipped { index }).is_err() {
                break;
            }
            continue;
        }
        let started = Event::Started {
            index,
            worker: id,
            at: Instant::now(),
        };
        if events.send(started).is_err() {
            break;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| work(job))).map_err(panic_message);
        if events.send(Event::Finished { index, result }).is_err() {
            break;
        }
        if retired.load(Ordering::SeqCst) {
            break;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn humanize(limit: Duration) -> String {
    humantime::format_duration(limit).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(workers: usize, timeout: Option<Duration>) -> TaskPool {
        TaskPool::new(PoolConfig::new(workers, timeout).named("test")).unwrap()
    }

    #[test]
    fn completes_every_job_in_submission_order() {
        let outcomes = pool(4, None)
            .run((0..32u64).collect(), |n| n * n)
            .unwrap();
        assert_eq!(outcomes.len(), 32);
        for (n, outcome) in outcomes.into_iter().enumerate() {
            assert_eq!(outcome, TaskOutcome::Completed((n * n) as u64));
        }
    }

    #[test]
    fn empty_job_list_returns_immediately() {
        let outcomes = pool(2, None).run(Vec::<u8>::new(), |n| n).unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(
            TaskPool::new(PoolConfig::new(0, None)),
            Err(PoolError::NoWorkers)
        ));
    }

    #[test]
    fn slow_task_times_out_while_siblings_complete() {
        let limit = Duration::from_millis(200);
        let outcomes = pool(2, Some(limit))
            .run(vec![0u64, 1, 2, 3, 4], |n| {
                if n == 2 {
                    thread::sleep(Duration::from_secs(2));
                }
                n
            })
            .unwrap();
        assert_eq!(outcomes[2], TaskOutcome::TimedOut { limit });
        for n in [0usize, 1, 3, 4] {
            assert_eq!(outcomes[n], TaskOutcome::Completed(n as u64));
        }
    }

    #[test]
    fn stuck_worker_is_replaced() {
        let limit = Duration::from_millis(100);
        let outcomes = pool(1, Some(limit))
            .run(vec![true, false, false], |stuck| {
                if stuck {
                    thread::sleep(Duration::from_secs(2));
                }
                stuck
            })
            .unwrap();
        assert_eq!(outcomes[0], TaskOutcome::TimedOut { limit });
        assert_eq!(outcomes[1], TaskOutcome::Completed(false));
        assert_eq!(outcomes[2], TaskOutcome::Completed(false));
    }

    #[test]
    fn shutdown_cancels_queued_tasks() {
        let pool = pool(1, None);
        let handle = pool.shutdown_handle();
        let outcomes = pool
            .run(vec![0u8, 1, 2], move |n| {
                if n == 0 {
                    handle.request();
                }
                n
            })
            .unwrap();
        assert_eq!(outcomes[0], TaskOutcome::Completed(0));
        assert_eq!(outcomes[1], TaskOutcome::Cancelled);
        assert_eq!(outcomes[2], TaskOutcome::Cancelled);
    }

    #[test]
    fn abort_predicate_stops_the_run() {
        let run = pool(1, None)
            .run_until(vec![1i32, -1, 2], |n| n, |n| *n < 0)
            .unwrap();
        match run {
            PoolRun::Aborted { index, output } => {
                assert_eq!(index, 1);
                assert_eq!(output, -1);
            }
            PoolRun::Finished(_) => panic!("expected abort"),
        }
    }

    #[test]
    fn panicking_task_is_reported() {
        let outcomes = pool(2, None)
            .run(vec![0u8, 1], |n| {
                if n == 1 {
                    panic!("boom");
                }
                n
            })
            .unwrap();
        assert_eq!(outcomes[0], TaskOutcome::Completed(0));
        assert_eq!(
            outcomes[1],
            TaskOutcome::Panicked {
                message: "boom".to_string()
            }
        );
    }
}
