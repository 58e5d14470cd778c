//! Single-assignment checkpoint slots.
//!
//! Each worker gets exactly one slot: the task side holds a write-once
//! [`CheckpointSink`], the freeze barrier holds the matching read-once
//! [`CheckpointSlot`]. A bounded crossbeam channel carries the hand-off so
//! a task that has checkpointed never waits on the barrier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::FreezeError;
use crate::types::{Checkpoint, WorkerName};

/// Write-once sink for a worker's checkpoint.
#[derive(Clone)]
pub struct CheckpointSink {
    worker: WorkerName,
    sender: Sender<Checkpoint>,
    written: Arc<AtomicBool>,
}

impl CheckpointSink {
    /// Worker this sink belongs to.
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Write the worker's checkpoint.
    ///
    /// Exactly one write is allowed; a second write fails with
    /// [`FreezeError::SlotDoubleWrite`].
    pub fn fill(&self, checkpoint: Checkpoint) -> Result<()> {
        if self.written.swap(true, Ordering::SeqCst) {
            return Err(FreezeError::SlotDoubleWrite {
                worker: self.worker.clone(),
            }
            .into());
        }
        self.sender
            .send(checkpoint)
            .map_err(|_| anyhow!("checkpoint slot for {} dropped before write", self.worker))
    }
}

/// Read-once side of a slot, consumed by the freeze barrier.
pub struct CheckpointSlot {
    worker: WorkerName,
    receiver: Receiver<Checkpoint>,
}

impl CheckpointSlot {
    /// Worker this slot belongs to.
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Block until the worker writes its checkpoint.
    ///
    /// There is no timeout: the barrier waits for every worker, however
    /// long it takes. Errors only if the worker dropped its sink without
    /// ever suspending.
    pub fn wait(&self) -> Result<Checkpoint> {
        self.receiver.recv().map_err(|_| {
            anyhow!(
                "worker {} dropped its checkpoint sink before suspending",
                self.worker
            )
        })
    }
}

/// Create the sink/slot pair for one worker.
pub fn checkpoint_slot(worker: impl Into<WorkerName>) -> (CheckpointSink, CheckpointSlot) {
    let worker = worker.into();
    let (sender, receiver) = bounded(1);
    (
        CheckpointSink {
            worker: worker.clone(),
            sender,
            written: Arc::new(AtomicBool::new(false)),
        },
        CheckpointSlot { worker, receiver },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_then_wait_round_trip() {
        let (sink, slot) = checkpoint_slot("a");
        sink.fill(Checkpoint::new("a", vec![1, 2, 3])).unwrap();

        let checkpoint = slot.wait().unwrap();
        assert_eq!(checkpoint.worker, "a");
        assert_eq!(checkpoint.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_double_fill_is_an_error() {
        let (sink, _slot) = checkpoint_slot("a");
        sink.fill(Checkpoint::new("a", vec![])).unwrap();

        let err = sink.fill(Checkpoint::new("a", vec![])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FreezeError>(),
            Some(FreezeError::SlotDoubleWrite { .. })
        ));
    }

    #[test]
    fn test_double_fill_through_clone_is_an_error() {
        let (sink, _slot) = checkpoint_slot("a");
        let other = sink.clone();
        sink.fill(Checkpoint::new("a", vec![])).unwrap();

        let err = other.fill(Checkpoint::new("a", vec![])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FreezeError>(),
            Some(FreezeError::SlotDoubleWrite { .. })
        ));
    }

    #[test]
    fn test_wait_on_dropped_sink_is_an_error() {
        let (sink, slot) = checkpoint_slot("a");
        drop(sink);

        let err = slot.wait().unwrap_err();
        assert!(
            err.to_string().contains("dropped its checkpoint sink"),
            "unexpected error: {err}"
        );
    }
}
