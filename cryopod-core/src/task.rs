//! The worker model: routines split at their single suspension point.
//!
//! A worker is not a captured call stack. Phase one runs up to the
//! suspension point and returns the local state worth keeping; suspending
//! *is* returning, so a suspended worker holds no thread. Phase two is
//! rebuilt from the checkpoint by the codec and continues to the terminal
//! value. Both phases receive the shared [`TaskContext`], which is never
//! serialized — resumed tasks get it back through the codec's shared
//! registry, so every worker observes the same instances before and after
//! the freeze.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::codec::CheckpointCodec;
use crate::slot::CheckpointSink;
use crate::types::{Outcome, WorkerName};

/// Boxed future returned by routine phases.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Selection key of the greeting capability among candidate implementations.
pub const WELCOME: &str = "welcome";

/// Named greeting capability handed to every worker.
pub trait Greeter: Send + Sync {
    fn greet(&self, worker: &str) -> String;
}

/// Capabilities injected into every routine phase.
#[derive(Clone)]
pub struct TaskContext {
    pub greeter: Arc<dyn Greeter>,
}

impl TaskContext {
    pub fn new(greeter: Arc<dyn Greeter>) -> Self {
        Self { greeter }
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext").finish_non_exhaustive()
    }
}

/// A worker computation split at its single suspension point.
pub trait WorkerRoutine: Send + Sync + 'static {
    /// Stable key identifying this routine in the codec registry.
    fn kind(&self) -> &'static str;

    /// Run up to the suspension point, returning the serialized local state.
    fn run_to_suspension(&self, worker: WorkerName, ctx: TaskContext)
        -> BoxFuture<Result<Vec<u8>>>;

    /// Continue from captured local state to the terminal value.
    fn resume(
        &self,
        worker: WorkerName,
        ctx: TaskContext,
        state: Vec<u8>,
    ) -> BoxFuture<Result<String>>;
}

/// Builds one suspendable task per worker at freeze start.
pub trait TaskFactory: Send + Sync {
    /// Create the task for `worker`, wired to its checkpoint sink.
    fn create(&self, worker: WorkerName, sink: CheckpointSink) -> SuspendableTask;

    /// Routine kinds this factory produces, for decode-side registration.
    fn routines(&self) -> Vec<Arc<dyn WorkerRoutine>>;
}

/// Stock factory: every worker runs the same routine.
pub struct RoutineFactory {
    routine: Arc<dyn WorkerRoutine>,
}

impl RoutineFactory {
    pub fn new(routine: Arc<dyn WorkerRoutine>) -> Self {
        Self { routine }
    }
}

impl TaskFactory for RoutineFactory {
    fn create(&self, worker: WorkerName, sink: CheckpointSink) -> SuspendableTask {
        SuspendableTask::new(worker, Arc::clone(&self.routine), sink)
    }

    fn routines(&self) -> Vec<Arc<dyn WorkerRoutine>> {
        vec![Arc::clone(&self.routine)]
    }
}

/// One live task driving a routine to its suspension point.
pub struct SuspendableTask {
    worker: WorkerName,
    routine: Arc<dyn WorkerRoutine>,
    sink: CheckpointSink,
}

impl SuspendableTask {
    pub fn new(worker: WorkerName, routine: Arc<dyn WorkerRoutine>, sink: CheckpointSink) -> Self {
        Self {
            worker,
            routine,
            sink,
        }
    }

    /// Run phase one and write the resulting checkpoint into the slot.
    pub async fn drive(self, codec: Arc<CheckpointCodec>, ctx: TaskContext) -> Result<()> {
        let Self {
            worker,
            routine,
            sink,
        } = self;
        let state = routine.run_to_suspension(worker.clone(), ctx).await?;
        let checkpoint = codec.encode(&worker, routine.kind(), state)?;
        sink.fill(checkpoint)
    }
}

/// A task rebuilt from a checkpoint, ready to continue where it left off.
pub struct ResumableTask {
    worker: WorkerName,
    routine: Arc<dyn WorkerRoutine>,
    ctx: TaskContext,
    state: Vec<u8>,
}

impl std::fmt::Debug for ResumableTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableTask")
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

impl ResumableTask {
    pub fn new(
        worker: WorkerName,
        routine: Arc<dyn WorkerRoutine>,
        ctx: TaskContext,
        state: Vec<u8>,
    ) -> Self {
        Self {
            worker,
            routine,
            ctx,
            state,
        }
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Continue the computation to its terminal value.
    pub fn resume(self) -> BoxFuture<Result<String>> {
        let Self {
            worker,
            routine,
            ctx,
            state,
        } = self;
        routine.resume(worker, ctx, state)
    }
}

/// Live handle to one resumed task, producing a terminal [`Outcome`].
pub struct ResumedHandle {
    worker: WorkerName,
    receiver: Receiver<Outcome>,
}

impl ResumedHandle {
    /// Create a handle plus the sender its task reports through.
    pub fn channel(worker: WorkerName) -> (Sender<Outcome>, ResumedHandle) {
        let (sender, receiver) = bounded(1);
        (sender, ResumedHandle { worker, receiver })
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Wait up to `timeout` for the terminal outcome.
    ///
    /// `None` when the bound elapses or the task died without reporting.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        self.receiver.recv_timeout(timeout).ok()
    }
}
