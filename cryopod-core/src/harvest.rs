//! Sequential collection of resumed workers' outcomes.

use std::collections::VecDeque;
use std::time::Duration;

use crate::task::ResumedHandle;
use crate::types::{FreezeReport, Outcome};

/// Await each handle's terminal outcome, strictly in queue order.
///
/// Each handle gets up to `per_item_timeout`; a worker that times out or
/// fails is recorded lost and harvesting moves on to the next handle.
/// Nothing is canceled: a timed-out task keeps running on its scheduler,
/// unobserved. Worst-case wall time is `handles.len() * per_item_timeout`.
pub fn harvest(mut handles: VecDeque<ResumedHandle>, per_item_timeout: Duration) -> FreezeReport {
    let mut report = FreezeReport::default();
    while let Some(handle) = handles.pop_front() {
        match handle.wait_timeout(per_item_timeout) {
            Some(Outcome::Success(value)) => {
                tracing::info!("worker {} came back with: {}", handle.worker(), value);
                report.harvested.push((handle.worker().to_string(), value));
            }
            Some(Outcome::Failed(cause)) => {
                tracing::warn!("{} was lost: {}", handle.worker(), cause);
                report.lost.insert(handle.worker().to_string());
            }
            None => {
                tracing::warn!(
                    "{} was lost: no outcome within {:?}",
                    handle.worker(),
                    per_item_timeout
                );
                report.lost.insert(handle.worker().to_string());
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "tests/harvest_tests.rs"]
mod tests;
