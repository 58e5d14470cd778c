//! # Cryopod Core
//!
//! Freeze/resume orchestration for suspendable workers: drive N workers to
//! their suspension points concurrently, collect one portable checkpoint per
//! worker through an all-or-nothing barrier, rebuild every checkpoint into a
//! resumable task on an independent scheduler, and harvest the outcomes
//! under a per-worker bound.
//!
//! - [`types`] — value types: [`Checkpoint`](types::Checkpoint),
//!   [`Outcome`](types::Outcome), [`FreezeReport`](types::FreezeReport).
//! - [`slot`] — single-assignment checkpoint slots feeding the barrier.
//! - [`codec`] — opaque state images plus the identity registries.
//! - [`task`] — the worker model: [`WorkerRoutine`](task::WorkerRoutine)
//!   split at its suspension point, task factories, resumed handles.
//! - [`scheduler`] — bounded cooperative scheduler with a process-wide
//!   default instance for resumption.
//! - [`harvest`] — strictly sequential outcome collection.
//! - [`freezer`] — the orchestrator tying the protocol together.
//! - [`error`] — the failure taxonomy surfaced to callers.

pub mod codec;
pub mod error;
pub mod freezer;
pub mod harvest;
pub mod scheduler;
pub mod slot;
pub mod task;
pub mod types;
