//! Lifecycle engine for remote long-running operations.
//!
//! An operation (a mesh, a simulation run, a geometry import) is created on
//! a remote service, checked, estimated, started, and then polled until it
//! reaches a terminal status. [`PollingEngine`] owns that sequence and its
//! policy ([`EngineConfig`]); a [`RemoteOperationClient`] supplies the
//! remote verbs for one kind of operation.
//!
//! [`Executor`] wraps the engine in three ways to run it:
//!
//! * [`Executor::run`] blocks the calling thread.
//! * [`Executor::run_detached`] returns at once and reports through a
//!   one-shot callback.
//! * [`Executor::run_cancellable`] returns an [`OperationTask`] that can be
//!   cancelled, streams progress, and is shared with concurrent callers
//!   submitting the same request.

pub mod chain;
mod client;
mod config;
mod duration;
mod engine;
mod error;
mod estimate;
mod model;
pub mod modes;
mod outcome;
mod progress;
pub mod scripted;
mod validate;

pub use chain::{ChainOutcome, ChainStep, run_chained};
pub use client::{OperationKey, OperationRequest, RemoteOperationClient};
pub use config::{ConfigError, EngineConfig};
pub use duration::{DurationParseError, parse_iso8601_duration};
pub use engine::PollingEngine;
pub use error::{ClientError, EngineError, Result};
pub use estimate::{BudgetDecision, BudgetSource, TimeoutBudget, estimate_budget};
pub use model::{
	DurationInterval, Estimate, OperationContext, OperationId, OperationKind, OperationRef, OperationStatus, Severity, StatusSnapshot,
	UnknownStatus, ValidationEntry,
};
pub use modes::{Executor, OperationTask};
pub use outcome::{Cancellation, Completion, EstimateGap, Outcome, RunResult, RunWarning};
pub use progress::{NoProgress, ProgressEvent, ProgressSink, Stage};
pub use validate::{ValidationReport, check_setup};
pub use tokio_util::sync::CancellationToken;
