use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Unique identity of one suspendable worker.
pub type WorkerName = String;

/// Opaque serialized snapshot of one suspended worker.
///
/// Produced exactly once per worker at its suspension point, consumed
/// exactly once to rebuild a resumable task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub worker: WorkerName,
    pub bytes: Vec<u8>,
}

impl Checkpoint {
    /// Create a checkpoint envelope for the given worker.
    pub fn new(worker: impl Into<WorkerName>, bytes: Vec<u8>) -> Self {
        Self {
            worker: worker.into(),
            bytes,
        }
    }
}

/// Terminal outcome reported by one resumed worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The worker ran to completion with a final value.
    Success(String),
    /// The worker failed before producing a value.
    Failed(String),
}

/// Aggregate result of one freeze/resume cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezeReport {
    /// `(worker, value)` pairs in harvesting order.
    pub harvested: Vec<(WorkerName, String)>,
    /// Workers that produced no value within their harvest bound.
    pub lost: BTreeSet<WorkerName>,
}

impl FreezeReport {
    /// True when every worker came back.
    pub fn is_clean(&self) -> bool {
        self.lost.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_envelope() {
        let checkpoint = Checkpoint::new("a", vec![1, 2, 3]);
        assert_eq!(checkpoint.worker, "a");
        assert_eq!(checkpoint.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_report_is_clean() {
        assert!(FreezeReport::default().is_clean());
    }

    #[test]
    fn test_report_with_lost_worker_is_not_clean() {
        let mut report = FreezeReport::default();
        report.lost.insert("b".to_string());
        assert!(!report.is_clean());
    }
}
