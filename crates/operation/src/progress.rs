//! Observable progress of a run. Emitting never affects control flow.

use std::time::Duration;

use crate::model::{OperationId, OperationKind, OperationStatus};

/// Lifecycle step a progress event was emitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Creating,
	Checking,
	Estimating,
	Starting,
	Polling,
	Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
	/// `None` until the service has assigned an id.
	pub operation: Option<OperationId>,
	pub kind: OperationKind,
	pub stage: Stage,
	pub status: Option<OperationStatus>,
	pub progress: Option<f64>,
	/// Time since polling began; zero before that.
	pub elapsed: Duration,
	pub consecutive_failures: u32,
}

impl ProgressEvent {
	pub(crate) fn stage(kind: &OperationKind, operation: Option<&OperationId>, stage: Stage) -> Self {
		Self {
			operation: operation.cloned(),
			kind: kind.clone(),
			stage,
			status: None,
			progress: None,
			elapsed: Duration::ZERO,
			consecutive_failures: 0,
		}
	}
}

/// Receiver of progress events. Must be callable from any worker thread.
pub trait ProgressSink: Send + Sync {
	fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
	fn emit(&self, _event: ProgressEvent) {}
}

impl<F> ProgressSink for F
where
	F: Fn(ProgressEvent) + Send + Sync,
{
	fn emit(&self, event: ProgressEvent) {
		self(event);
	}
}
