//! Background Validation Executor
//!
//! Runs validations off the caller's thread with at most one request in
//! flight. A new submission cancels whatever is queued or running, every run
//! is bounded by a timeout, and outcomes are queued for the caller to
//! dispatch on its own thread.
//!
//! Each submission gets a generation number. When a delivery is dispatched
//! its generation is compared with the latest one handed out, so a result
//! that finished just before being superseded still surfaces as cancelled.
//!
//! Worker threads drop to the lowest OS scheduling priority when they start.

pub mod task;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, trace, warn};
use thread_priority::{set_current_thread_priority, ThreadPriority};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;

pub use task::{Outcome, ValidationCallback, ValidationTask};

/// Default bound on a single validation run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// How long shutdown waits for the worker pool
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Worker pool settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    pub workers: usize,
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);

        Self {
            workers: (parallelism / 2).max(1),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ExecutorConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// One-shot cancellation signal shared between the caller and a run
#[derive(Debug, Clone)]
struct CancelFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelFlag {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    fn cancel(&self) {
        self.tx.send_replace(true);
    }

    fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as self, so this only returns once set
        let _ = rx.wait_for(|&cancelled| cancelled).await;
    }
}

struct InFlight {
    generation: u64,
    cancel: CancelFlag,
}

#[derive(Default)]
struct Shared {
    generation: AtomicU64,
    current: Mutex<Option<InFlight>>,
    started_threads: AtomicUsize,
}

impl Shared {
    /// Runs on every pool thread before it takes work
    fn thread_started(&self) {
        self.started_threads.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = set_current_thread_priority(ThreadPriority::Min) {
            warn!("could not lower validation thread priority: {:?}", err);
        }
    }

    fn latest(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Claim a new generation and cancel whatever held the slot
    fn supersede(&self) -> (u64, CancelFlag) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(previous) = current.take() {
            trace!(
                "generation {} supersedes {}",
                generation, previous.generation
            );
            previous.cancel.cancel();
        }

        let cancel = CancelFlag::new();
        *current = Some(InFlight {
            generation,
            cancel: cancel.clone(),
        });
        (generation, cancel)
    }

    fn finish(&self, generation: u64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation)
        {
            *current = None;
        }
    }

    fn cancel_current(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst);

        match current.take() {
            Some(in_flight) => {
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// A finished submission waiting to be dispatched
pub struct Delivery {
    generation: u64,
    callback: Box<dyn ValidationCallback>,
    outcome: Outcome,
}

impl Delivery {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn dispatch(self, latest: u64) {
        let Delivery {
            generation,
            mut callback,
            outcome,
        } = self;

        match outcome {
            Outcome::Completed(result) if generation == latest => callback.on_completed(result),
            Outcome::Completed(_) => {
                debug!("dropping stale result of generation {}", generation);
                callback.on_cancelled();
            }
            Outcome::Cancelled => callback.on_cancelled(),
            Outcome::Failed(error) => callback.on_error(error),
        }
    }
}

/// Caller-side end of the delivery queue
pub struct Deliveries {
    rx: mpsc::Receiver<Delivery>,
    shared: Arc<Shared>,
}

impl Deliveries {
    /// Dispatch everything already queued, returning how many were dispatched
    pub fn dispatch_pending(&self) -> usize {
        let mut dispatched = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            delivery.dispatch(self.shared.latest());
            dispatched += 1;
        }
        dispatched
    }

    /// Wait up to `timeout` for one delivery and dispatch it
    pub fn dispatch_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => {
                delivery.dispatch(self.shared.latest());
                true
            }
            Err(_) => false,
        }
    }
}

/// Single-flight validation executor backed by a dedicated tokio runtime
pub struct ValidationExecutor {
    runtime: Option<Runtime>,
    shared: Arc<Shared>,
    tx: mpsc::Sender<Delivery>,
    timeout: Duration,
}

impl ValidationExecutor {
    pub fn new(config: ExecutorConfig) -> Result<(Self, Deliveries)> {
        let workers = config.workers.max(1);
        let shared = Arc::new(Shared::default());
        let on_start = Arc::clone(&shared);

        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(workers)
            .thread_name("kalix-validation")
            .on_thread_start(move || on_start.thread_started())
            .enable_time()
            .build()
            .context("failed to start validation worker pool")?;

        debug!(
            "validation executor started with {} workers, timeout {:?}",
            workers, config.timeout
        );

        let (tx, rx) = mpsc::channel();

        let executor = Self {
            runtime: Some(runtime),
            shared: Arc::clone(&shared),
            tx,
            timeout: config.timeout,
        };
        Ok((executor, Deliveries { rx, shared }))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pool threads started so far, each at reduced priority where the OS allows
    pub fn started_threads(&self) -> usize {
        self.shared.started_threads.load(Ordering::Relaxed)
    }

    /// Cancel whatever is in flight and start validating `content`
    pub fn submit_validation<T, C>(&self, content: String, task: T, callback: C)
    where
        T: ValidationTask,
        C: ValidationCallback,
    {
        self.schedule(content, task, Box::new(callback), None);
    }

    /// Like [`submit_validation`](Self::submit_validation), but only once
    /// `delay` passes without a newer submission
    pub fn submit_validation_with_debounce<T, C>(
        &self,
        content: String,
        task: T,
        callback: C,
        delay: Duration,
    ) where
        T: ValidationTask,
        C: ValidationCallback,
    {
        self.schedule(content, task, Box::new(callback), Some(delay));
    }

    /// Cancel the running or pending validation, if any
    pub fn cancel_current_validation(&self) -> bool {
        self.shared.cancel_current()
    }

    /// Whether a validation is running or waiting out its debounce delay
    pub fn is_validation_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Cancel in-flight work and stop the worker pool
    pub fn shutdown(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        self.shared.cancel_current();
        runtime.shutdown_timeout(SHUTDOWN_GRACE);
        debug!("validation executor stopped");
    }

    fn schedule(
        &self,
        content: String,
        task: impl ValidationTask,
        callback: Box<dyn ValidationCallback>,
        debounce: Option<Duration>,
    ) {
        let Some(runtime) = &self.runtime else {
            warn!("validation submitted after shutdown");
            let _ = self.tx.send(Delivery {
                generation: 0,
                callback,
                outcome: Outcome::Cancelled,
            });
            return;
        };

        let (generation, cancel) = self.shared.supersede();
        let run = Run {
            generation,
            cancel,
            timeout: self.timeout,
            shared: Arc::clone(&self.shared),
            tx: self.tx.clone(),
        };

        runtime.spawn(async move {
            if let Some(delay) = debounce {
                tokio::select! {
                    _ = run.cancel.cancelled() => {
                        // A newer request replaced this one before it started
                        trace!("debounced generation {} superseded", run.generation);
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            run.execute(content, task, callback).await;
        });
    }
}

impl Drop for ValidationExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Run {
    generation: u64,
    cancel: CancelFlag,
    timeout: Duration,
    shared: Arc<Shared>,
    tx: mpsc::Sender<Delivery>,
}

impl Run {
    async fn execute(
        self,
        content: String,
        task: impl ValidationTask,
        callback: Box<dyn ValidationCallback>,
    ) {
        let outcome = if self.cancel.is_cancelled() {
            Outcome::Cancelled
        } else {
            self.race(content, task).await
        };

        trace!(
            "generation {} finished (completed: {})",
            self.generation,
            outcome.is_completed()
        );

        self.shared.finish(self.generation);
        let _ = self.tx.send(Delivery {
            generation: self.generation,
            callback,
            outcome,
        });
    }

    async fn race(&self, content: String, task: impl ValidationTask) -> Outcome {
        let cancel = self.cancel.clone();
        let work = tokio::task::spawn_blocking(move || {
            // Still queued when superseded: never run
            if cancel.is_cancelled() {
                return None;
            }
            Some(task.validate(&content))
        });

        tokio::select! {
            _ = self.cancel.cancelled() => Outcome::Cancelled,
            joined = tokio::time::timeout(self.timeout, work) => match joined {
                Err(_) => {
                    warn!(
                        "validation timed out after {:?} (generation {})",
                        self.timeout, self.generation
                    );
                    Outcome::Cancelled
                }
                Ok(Ok(None)) => Outcome::Cancelled,
                Ok(Ok(Some(Ok(result)))) => Outcome::Completed(result),
                Ok(Ok(Some(Err(error)))) => Outcome::Failed(error),
                Ok(Err(join_error)) if join_error.is_panic() => {
                    Outcome::Failed(anyhow!("validation task panicked"))
                }
                Ok(Err(join_error)) => Outcome::Failed(join_error.into()),
            },
        }
    }
}
