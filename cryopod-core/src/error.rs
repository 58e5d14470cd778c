use std::collections::BTreeSet;

use thiserror::Error;

use crate::types::WorkerName;

/// Failures surfaced by the freeze/resume protocol.
///
/// Per-worker resume failures never escape directly; they are logged and
/// folded into [`FreezeError::Lost`] once harvesting completes.
#[derive(Debug, Error)]
pub enum FreezeError {
    /// A worker attempted to write its checkpoint slot twice.
    #[error("worker {worker} wrote its checkpoint slot twice")]
    SlotDoubleWrite { worker: WorkerName },

    /// One or more workers never came back from resumption.
    #[error("workers lost: {names:?}")]
    Lost { names: BTreeSet<WorkerName> },
}
