//! Error types for remote calls and engine runs.

use std::time::Duration;

use thiserror::Error;

use crate::duration::DurationParseError;
use crate::model::{OperationId, OperationKind, OperationStatus, StatusSnapshot, ValidationEntry};

/// Failure reported by a [`RemoteOperationClient`](crate::RemoteOperationClient) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
	/// The service answered with an error status.
	#[error("remote service responded {code}: {message}")]
	Api { code: u16, message: String },

	/// The request could not be delivered or its response not read.
	#[error("transport error: {0}")]
	Transport(String),

	/// The service answered with something the client could not interpret.
	#[error("invalid response: {0}")]
	InvalidResponse(String),
}

impl ClientError {
	pub fn api(code: u16, message: impl Into<String>) -> Self {
		Self::Api {
			code,
			message: message.into(),
		}
	}

	/// Returns the service status code, if the service answered at all.
	pub const fn code(&self) -> Option<u16> {
		match self {
			Self::Api { code, .. } => Some(*code),
			_ => None,
		}
	}
}

impl From<DurationParseError> for ClientError {
	fn from(err: DurationParseError) -> Self {
		Self::InvalidResponse(err.to_string())
	}
}

/// Fatal outcome of one engine run.
///
/// Caller cancellation is not an error; it is reported as
/// [`Outcome::Canceled`](crate::Outcome::Canceled).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
	#[error("failed to create {kind} operation: {source}")]
	CreateFailed { kind: OperationKind, source: ClientError },

	#[error("setup check for {operation} could not run: {source}")]
	CheckFailed { operation: OperationId, source: ClientError },

	#[error("setup check for {operation} reported {count} error(s)", count = .errors.len())]
	SetupValidationFailed {
		operation: OperationId,
		errors: Vec<ValidationEntry>,
		warnings: Vec<ValidationEntry>,
	},

	#[error("duration estimate for {operation} failed: {source}")]
	EstimationFailed { operation: OperationId, source: ClientError },

	#[error("failed to start {operation}: {source}")]
	StartFailed { operation: OperationId, source: ClientError },

	#[error("status refresh for {operation} failed after {elapsed:?}: {source}")]
	RefreshFailed {
		operation: OperationId,
		last: Option<StatusSnapshot>,
		elapsed: Duration,
		source: ClientError,
	},

	#[error("status refresh for {operation} returned nothing {failures} times in a row")]
	PollingExhausted {
		operation: OperationId,
		failures: u32,
		last: Option<StatusSnapshot>,
		elapsed: Duration,
	},

	#[error("{operation} did not reach a terminal status within {budget:?}")]
	Timeout {
		operation: OperationId,
		budget: Duration,
		elapsed: Duration,
		last: Option<StatusSnapshot>,
	},

	#[error("{operation} ended with status {status}")]
	OperationFailed {
		operation: OperationId,
		status: OperationStatus,
		progress: Option<f64>,
		elapsed: Duration,
	},

	#[error("cannot derive dependent operation from {operation}: {reason}")]
	ChainBroken { operation: OperationId, reason: String },

	#[error("execution runtime error: {message}")]
	Runtime { message: String },
}

impl EngineError {
	pub(crate) fn runtime(message: impl Into<String>) -> Self {
		Self::Runtime { message: message.into() }
	}

	/// Operation the failure belongs to, when one had been created.
	pub fn operation(&self) -> Option<&OperationId> {
		match self {
			Self::CheckFailed { operation, .. }
			| Self::SetupValidationFailed { operation, .. }
			| Self::EstimationFailed { operation, .. }
			| Self::StartFailed { operation, .. }
			| Self::RefreshFailed { operation, .. }
			| Self::PollingExhausted { operation, .. }
			| Self::Timeout { operation, .. }
			| Self::OperationFailed { operation, .. }
			| Self::ChainBroken { operation, .. } => Some(operation),
			Self::CreateFailed { .. } | Self::Runtime { .. } => None,
		}
	}

	/// Time spent polling before the failure, for failures raised while polling.
	pub fn elapsed(&self) -> Option<Duration> {
		match self {
			Self::RefreshFailed { elapsed, .. }
			| Self::PollingExhausted { elapsed, .. }
			| Self::Timeout { elapsed, .. }
			| Self::OperationFailed { elapsed, .. } => Some(*elapsed),
			_ => None,
		}
	}

	/// Last status observed before the failure.
	pub fn last_status(&self) -> Option<OperationStatus> {
		match self {
			Self::RefreshFailed { last, .. } | Self::PollingExhausted { last, .. } | Self::Timeout { last, .. } => {
				last.as_ref().map(|snapshot| snapshot.status)
			}
			Self::OperationFailed { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Result type for engine runs.
pub type Result<T> = std::result::Result<T, EngineError>;
