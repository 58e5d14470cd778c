//! Bounded cooperative scheduler.
//!
//! Hosts many lightweight tasks on a fixed pool of worker threads sized to
//! the available processors; a worker that has suspended holds no thread at
//! all. A process-wide default instance exists so resumption is decoupled
//! from the lifetime of the scheduler that originally froze the workers.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::available_parallelism;

use anyhow::{anyhow, Context, Result};
use tokio::runtime::{Builder, Handle, Runtime};

/// Observer invoked when a task fails before producing its outcome.
pub type FailureObserver = Arc<dyn Fn(&str, &anyhow::Error) + Send + Sync>;

/// Named wrapper around one bounded thread pool.
pub struct TaskScheduler {
    name: String,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    accepting: AtomicBool,
}

impl TaskScheduler {
    /// Build a scheduler over a pool sized to the available processors.
    pub fn new(name: &str) -> Result<Self> {
        let workers = available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(4);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name(format!("{name}-pool"))
            .enable_time()
            .build()
            .with_context(|| format!("failed to build {} scheduler pool", name))?;
        let handle = runtime.handle().clone();
        Ok(Self {
            name: name.to_string(),
            runtime: Mutex::new(Some(runtime)),
            handle,
            accepting: AtomicBool::new(true),
        })
    }

    /// Process-wide scheduler used to resume deserialized tasks.
    ///
    /// Independently lifecycled: shutting down a freezer's own scheduler
    /// leaves this one untouched.
    pub fn default_instance() -> &'static TaskScheduler {
        static DEFAULT: OnceLock<TaskScheduler> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            TaskScheduler::new("default").expect("default scheduler construction failed")
        })
    }

    /// Start a named task. Failures are logged with the worker name.
    pub fn spawn<F>(&self, worker: &str, future: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let observer: FailureObserver = Arc::new(|worker, err| {
            tracing::error!("task {} failed: {}", worker, err);
        });
        self.spawn_observed(worker, future, observer)
    }

    /// Start a named task with an uncaught-failure observer.
    ///
    /// Refuses new tasks once the scheduler has shut down.
    pub fn spawn_observed<F>(&self, worker: &str, future: F, observer: FailureObserver) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(anyhow!(
                "scheduler {} is shut down, refusing task {}",
                self.name,
                worker
            ));
        }
        let worker = worker.to_string();
        self.handle.spawn(async move {
            if let Err(err) = future.await {
                observer(&worker, &err);
            }
        });
        Ok(())
    }

    /// Stop accepting tasks and release the pool.
    ///
    /// Safe to call more than once, before anything was spawned, or while
    /// a freeze is still mid-flight.
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            tracing::info!("shutting down scheduler {}", self.name);
        }
        if let Ok(mut guard) = self.runtime.lock() {
            if let Some(runtime) = guard.take() {
                runtime.shutdown_background();
            }
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
