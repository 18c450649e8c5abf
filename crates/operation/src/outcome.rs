//! Terminal results handed back by every execution mode.

use std::fmt;
use std::time::Duration;

use crate::error::EngineError;
use crate::model::{OperationId, OperationRef, StatusSnapshot, ValidationEntry};

/// Why the budget fell back instead of following an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateGap {
	/// The service answered without a duration.
	NoDuration,
	/// The service rejected estimation for this configuration.
	Unsupported { code: u16 },
}

/// Non-fatal condition accumulated during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunWarning {
	/// WARNING entry returned by a setup check.
	Setup { operation: OperationId, entry: ValidationEntry },
	/// No usable estimate; the fallback budget applies.
	EstimateUnavailable {
		operation: OperationId,
		gap: EstimateGap,
		fallback: Duration,
	},
}

impl fmt::Display for RunWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Setup { operation, entry } => write!(f, "{operation}: setup check {entry}"),
			Self::EstimateUnavailable {
				operation,
				gap: EstimateGap::NoDuration,
				fallback,
			} => write!(
				f,
				"{operation}: estimated duration not available, assuming max runtime of {} seconds",
				fallback.as_secs()
			),
			Self::EstimateUnavailable {
				operation,
				gap: EstimateGap::Unsupported { code },
				fallback,
			} => write!(
				f,
				"{operation}: estimation not supported (status {code}), assuming max runtime of {} seconds",
				fallback.as_secs()
			),
		}
	}
}

/// A run whose operation reached `FINISHED`.
#[derive(Debug, Clone)]
pub struct Completion {
	pub operation: OperationRef,
	/// Final snapshot; always `FINISHED`.
	pub snapshot: StatusSnapshot,
	pub budget: Duration,
	/// Time spent polling.
	pub elapsed: Duration,
	/// Refreshes performed after the initial one.
	pub polls: u32,
	pub warnings: Vec<RunWarning>,
}

impl Completion {
	/// Identifier of the object the operation produced.
	pub fn artifact(&self) -> Option<&str> {
		self.snapshot.artifact.as_deref()
	}
}

/// A run stopped by its caller before the operation reached a terminal status.
#[derive(Debug, Clone)]
pub struct Cancellation {
	/// `None` when cancellation happened before creation.
	pub operation: Option<OperationRef>,
	pub last: Option<StatusSnapshot>,
	pub elapsed: Duration,
	pub warnings: Vec<RunWarning>,
}

/// Non-fatal end of a run.
#[derive(Debug, Clone)]
pub enum Outcome {
	Finished(Completion),
	Canceled(Cancellation),
}

impl Outcome {
	pub fn is_finished(&self) -> bool {
		matches!(self, Self::Finished(_))
	}

	pub fn is_canceled(&self) -> bool {
		matches!(self, Self::Canceled(_))
	}

	pub fn into_finished(self) -> Option<Completion> {
		match self {
			Self::Finished(completion) => Some(completion),
			Self::Canceled(_) => None,
		}
	}

	pub fn warnings(&self) -> &[RunWarning] {
		match self {
			Self::Finished(completion) => &completion.warnings,
			Self::Canceled(cancellation) => &cancellation.warnings,
		}
	}
}

/// What every execution mode hands back.
pub type RunResult = Result<Outcome, EngineError>;
