//! Checkpoint encoding and the identity registries.
//!
//! The codec turns a suspended task's declared local state into an opaque
//! byte image and rebuilds an independently resumable task from it. Two
//! registries keep decode well-defined:
//!
//! - routine kinds, so an image names *what* continues instead of carrying
//!   a captured call stack;
//! - shared capabilities, so anything that must stay a single shared
//!   instance is encoded as a stable key and resolved back to the same
//!   `Arc` on every decode.
//!
//! Registration is idempotent. Mappings must be in place before any
//! concurrent suspension or resumption begins; the orchestrator re-applies
//! them at the start of every freeze cycle.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::task::{ResumableTask, TaskContext, WorkerRoutine};
use crate::types::{Checkpoint, WorkerName};

/// Registry key under which the shared task context is stored.
pub const TASK_CONTEXT_KEY: &str = "task-context";

/// Wire image of one suspended task. Shared dependencies appear only as
/// registry keys, never inline.
#[derive(Debug, Serialize, Deserialize)]
struct TaskImage {
    worker: WorkerName,
    routine: String,
    context: String,
    state: Vec<u8>,
}

/// Codec capability: opaque state images plus the identity registries.
#[derive(Default)]
pub struct CheckpointCodec {
    routines: Mutex<HashMap<String, Arc<dyn WorkerRoutine>>>,
    shared: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl CheckpointCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a routine kind for decode.
    ///
    /// Idempotent: re-registering the same kind replaces the mapping
    /// without error.
    pub fn register_routine(&self, routine: Arc<dyn WorkerRoutine>) -> Result<()> {
        self.routines
            .lock()
            .map_err(|_| anyhow!("routine registry lock poisoned"))?
            .insert(routine.kind().to_string(), routine);
        Ok(())
    }

    /// Register a shared capability under a stable key.
    ///
    /// Idempotent; decode resolves the key back to this same instance
    /// every time.
    pub fn register_shared<T: Send + Sync + 'static>(&self, key: &str, value: Arc<T>) -> Result<()> {
        self.shared
            .lock()
            .map_err(|_| anyhow!("shared registry lock poisoned"))?
            .insert(key.to_string(), value);
        Ok(())
    }

    /// Resolve a shared capability previously registered under `key`.
    pub fn resolve_shared<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>> {
        let entry = self
            .shared
            .lock()
            .map_err(|_| anyhow!("shared registry lock poisoned"))?
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("no shared capability registered under {}", key))?;
        entry
            .downcast::<T>()
            .map_err(|_| anyhow!("shared capability {} has an unexpected type", key))
    }

    /// Encode a suspended task's declared state into a checkpoint.
    pub fn encode(
        &self,
        worker: &WorkerName,
        routine_kind: &str,
        state: Vec<u8>,
    ) -> Result<Checkpoint> {
        let image = TaskImage {
            worker: worker.clone(),
            routine: routine_kind.to_string(),
            context: TASK_CONTEXT_KEY.to_string(),
            state,
        };
        let bytes = bincode::serialize(&image)
            .with_context(|| format!("serialize checkpoint for worker {} failed", worker))?;
        Ok(Checkpoint::new(worker.clone(), bytes))
    }

    /// Rebuild an independently resumable task from a checkpoint.
    pub fn decode(&self, checkpoint: &Checkpoint) -> Result<ResumableTask> {
        let image: TaskImage = bincode::deserialize(&checkpoint.bytes).with_context(|| {
            format!(
                "deserialize checkpoint for worker {} failed",
                checkpoint.worker
            )
        })?;
        if image.worker != checkpoint.worker {
            return Err(anyhow!(
                "checkpoint identity mismatch: envelope {} carries image for {}",
                checkpoint.worker,
                image.worker
            ));
        }
        let routine = self
            .routines
            .lock()
            .map_err(|_| anyhow!("routine registry lock poisoned"))?
            .get(&image.routine)
            .cloned()
            .ok_or_else(|| anyhow!("no routine registered for kind {}", image.routine))?;
        let context: Arc<TaskContext> = self.resolve_shared(&image.context)?;
        Ok(ResumableTask::new(
            image.worker,
            routine,
            (*context).clone(),
            image.state,
        ))
    }
}

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod tests;
