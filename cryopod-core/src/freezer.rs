//! The freeze/resume orchestrator.
//!
//! One [`Freezer::freeze`] call runs the whole protocol:
//!
//! ```text
//! for each worker:
//!     allocate slot, create task, spawn on the freezer scheduler
//! barrier: wait until every slot holds a checkpoint   (no timeout)
//! for each checkpoint, in written order:
//!     decode a resumable task, spawn it on the default scheduler
//! harvest the resumed handles FIFO under the per-worker bound
//! empty lost set => report, otherwise aggregate error
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::codec::{CheckpointCodec, TASK_CONTEXT_KEY};
use crate::error::FreezeError;
use crate::harvest::harvest;
use crate::scheduler::{FailureObserver, TaskScheduler};
use crate::slot::checkpoint_slot;
use crate::task::{Greeter, ResumableTask, ResumedHandle, TaskContext, TaskFactory};
use crate::types::{FreezeReport, Outcome, WorkerName};

/// Fixed per-worker harvest bound.
const HARVEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrates one freeze -> barrier -> resume -> harvest cycle.
pub struct Freezer {
    scheduler: TaskScheduler,
    codec: Arc<CheckpointCodec>,
    factory: Arc<dyn TaskFactory>,
    ctx: TaskContext,
    harvest_timeout: Duration,
}

impl Freezer {
    /// Assemble a freezer from its injected collaborators.
    pub fn new(factory: Arc<dyn TaskFactory>, greeter: Arc<dyn Greeter>) -> Result<Self> {
        Ok(Self {
            scheduler: TaskScheduler::new("freezer")?,
            codec: Arc::new(CheckpointCodec::new()),
            factory,
            ctx: TaskContext::new(greeter),
            harvest_timeout: HARVEST_TIMEOUT,
        })
    }

    /// Override the per-worker harvest bound.
    pub fn with_harvest_timeout(mut self, timeout: Duration) -> Self {
        self.harvest_timeout = timeout;
        self
    }

    /// Codec shared with the tasks, exposed for bootstrap-time
    /// registrations.
    pub fn codec(&self) -> &Arc<CheckpointCodec> {
        &self.codec
    }

    /// Suspend every worker into a checkpoint, resume all of them on the
    /// default scheduler, and harvest the outcomes.
    ///
    /// Blocks until every worker has reached its suspension point — the
    /// barrier has no timeout — and then until harvesting completes.
    /// Returns the report when every worker came back; fails with
    /// [`FreezeError::Lost`] naming the workers that did not.
    pub fn freeze(&self, workers: &[WorkerName]) -> Result<FreezeReport> {
        // Registrations must land before any task runs; idempotent per call.
        for routine in self.factory.routines() {
            self.codec.register_routine(routine)?;
        }
        self.codec
            .register_shared(TASK_CONTEXT_KEY, Arc::new(self.ctx.clone()))?;

        let mut slots = Vec::with_capacity(workers.len());
        for worker in workers {
            tracing::info!("freezing {}", worker);
            let (sink, slot) = checkpoint_slot(worker.clone());
            let task = self.factory.create(worker.clone(), sink);
            let codec = Arc::clone(&self.codec);
            let ctx = self.ctx.clone();
            self.scheduler
                .spawn(worker, async move { task.drive(codec, ctx).await })?;
            slots.push(slot);
        }

        // Barrier: wait for everyone to finish checkpointing.
        let mut checkpoints = Vec::with_capacity(slots.len());
        for slot in &slots {
            checkpoints.push(slot.wait()?);
        }

        // Now wake everyone up on the default scheduler.
        let mut running = VecDeque::with_capacity(checkpoints.len());
        for checkpoint in &checkpoints {
            let task = self
                .codec
                .decode(checkpoint)
                .with_context(|| format!("reconstructing worker {} failed", checkpoint.worker))?;
            running.push_back(resume_task(task)?);
        }

        let report = harvest(running, self.harvest_timeout);
        if report.is_clean() {
            Ok(report)
        } else {
            Err(FreezeError::Lost { names: report.lost }.into())
        }
    }

    /// Deactivation hook: stop the freezer's own scheduler.
    ///
    /// Safe to call whether or not [`freeze`](Self::freeze) ever ran or is
    /// still mid-flight. The default scheduler is left untouched.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

/// Restart one reconstructed task on the default scheduler.
fn resume_task(task: ResumableTask) -> Result<ResumedHandle> {
    let worker = task.worker().to_string();
    let (outcome_tx, handle) = ResumedHandle::channel(worker.clone());
    let observer: FailureObserver = Arc::new(|worker, err| {
        tracing::error!("worker {} blew up during resume: {}", worker, err);
    });
    TaskScheduler::default_instance().spawn_observed(
        &worker,
        async move {
            match task.resume().await {
                Ok(value) => {
                    let _ = outcome_tx.send(Outcome::Success(value));
                    Ok(())
                }
                Err(err) => {
                    let _ = outcome_tx.send(Outcome::Failed(err.to_string()));
                    Err(err)
                }
            }
        },
        observer,
    )?;
    Ok(handle)
}

#[cfg(test)]
#[path = "tests/freezer_tests.rs"]
mod tests;
