//! The lifecycle state machine: create, check, estimate, start, poll.
//!
//! ```text
//! CREATED -> CHECKED -> STARTED -> { FINISHED | CANCELED | FAILED }
//! ```
//!
//! The engine itself is either polling or done. The poll-interval sleep is
//! its only suspension point, and refreshes of one operation never overlap.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::{OperationRequest, RemoteOperationClient};
use crate::config::{ConfigError, EngineConfig};
use crate::error::{EngineError, Result};
use crate::estimate::{self, TimeoutBudget};
use crate::model::{OperationRef, OperationStatus, StatusSnapshot};
use crate::outcome::{Cancellation, Completion, Outcome, RunResult, RunWarning};
use crate::progress::{ProgressEvent, ProgressSink, Stage};
use crate::validate;

/// Per-run polling bookkeeping. Private to one worker.
#[derive(Debug)]
pub(crate) struct PollState {
	started: Instant,
	consecutive_failures: u32,
	polls: u32,
	last: Option<StatusSnapshot>,
}

/// A refresh that returned nothing one time too many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Exhausted(pub u32);

impl PollState {
	pub(crate) fn new() -> Self {
		Self {
			started: Instant::now(),
			consecutive_failures: 0,
			polls: 0,
			last: None,
		}
	}

	pub(crate) fn elapsed(&self) -> Duration {
		self.started.elapsed()
	}

	/// Records one refresh. Any result resets the failure run; a miss extends
	/// it and fails once it exceeds `max_failures`.
	pub(crate) fn record(&mut self, refreshed: Option<StatusSnapshot>, max_failures: u32) -> std::result::Result<(), Exhausted> {
		match refreshed {
			Some(snapshot) => {
				self.consecutive_failures = 0;
				self.last = Some(snapshot);
				Ok(())
			}
			None => {
				self.consecutive_failures = self.consecutive_failures.saturating_add(1);
				if self.consecutive_failures > max_failures {
					Err(Exhausted(self.consecutive_failures))
				} else {
					Ok(())
				}
			}
		}
	}

	fn is_terminal(&self) -> bool {
		self.last.as_ref().is_some_and(StatusSnapshot::is_terminal)
	}
}

/// How the poll loop ended when it did not fail.
#[derive(Debug)]
enum PollExit {
	Terminal { snapshot: StatusSnapshot, elapsed: Duration, polls: u32 },
	Canceled { last: Option<StatusSnapshot>, elapsed: Duration },
}

/// Drives one operation through its whole remote lifecycle.
#[derive(Debug, Clone, Default)]
pub struct PollingEngine {
	config: EngineConfig,
}

impl PollingEngine {
	/// Builds an engine for `config` once it passes
	/// [`EngineConfig::validate`].
	pub fn new(config: EngineConfig) -> std::result::Result<Self, ConfigError> {
		config.validate()?;
		Ok(Self { config })
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Runs `request` from creation to a terminal status.
	///
	/// With a `cancel` token the run stops cooperatively: before creation,
	/// before start, and at every poll iteration boundary, ending with
	/// [`Outcome::Canceled`].
	pub async fn run<C>(
		&self,
		client: &C,
		request: &OperationRequest<C::Spec>,
		progress: &dyn ProgressSink,
		cancel: Option<&CancellationToken>,
	) -> RunResult
	where
		C: RemoteOperationClient + ?Sized,
	{
		let kind = client.kind();
		let mut warnings = Vec::new();

		if is_cancelled(cancel) {
			return Ok(Outcome::Canceled(Cancellation {
				operation: None,
				last: None,
				elapsed: Duration::ZERO,
				warnings,
			}));
		}

		progress.emit(ProgressEvent::stage(&kind, None, Stage::Creating));
		let id = client
			.create(&request.context, &request.name, &request.spec)
			.await
			.map_err(|source| EngineError::CreateFailed { kind: kind.clone(), source })?;
		let operation = OperationRef {
			id,
			kind,
			context: request.context.clone(),
		};
		tracing::info!(operation = %operation.id, kind = %operation.kind, name = %request.name, "operation.created");

		progress.emit(ProgressEvent::stage(&operation.kind, Some(&operation.id), Stage::Checking));
		let setup_warnings = validate::check_setup(client, &operation).await?;
		warnings.extend(setup_warnings.into_iter().map(|entry| RunWarning::Setup {
			operation: operation.id.clone(),
			entry,
		}));

		progress.emit(ProgressEvent::stage(&operation.kind, Some(&operation.id), Stage::Estimating));
		let decision = estimate::estimate_budget(client, &operation, &self.config).await?;
		if let Some(gap) = decision.gap() {
			warnings.push(RunWarning::EstimateUnavailable {
				operation: operation.id.clone(),
				gap,
				fallback: decision.budget.as_duration(),
			});
		}

		if is_cancelled(cancel) {
			tracing::info!(operation = %operation.id, "operation.canceled_before_start");
			return Ok(Outcome::Canceled(Cancellation {
				operation: Some(operation),
				last: None,
				elapsed: Duration::ZERO,
				warnings,
			}));
		}

		match self.start_and_poll(client, &operation, decision.budget, progress, cancel).await? {
			PollExit::Terminal { snapshot, elapsed, polls } => {
				progress.emit(ProgressEvent {
					status: Some(snapshot.status),
					progress: snapshot.progress,
					elapsed,
					..ProgressEvent::stage(&operation.kind, Some(&operation.id), Stage::Completed)
				});
				tracing::info!(
					operation = %operation.id,
					kind = %operation.kind,
					elapsed_ms = elapsed.as_millis() as u64,
					polls,
					warnings = warnings.len(),
					"operation.finished"
				);
				Ok(Outcome::Finished(Completion {
					operation,
					snapshot,
					budget: decision.budget.as_duration(),
					elapsed,
					polls,
					warnings,
				}))
			}
			PollExit::Canceled { last, elapsed } => {
				tracing::info!(operation = %operation.id, elapsed_ms = elapsed.as_millis() as u64, "operation.canceled");
				Ok(Outcome::Canceled(Cancellation {
					operation: Some(operation),
					last,
					elapsed,
					warnings,
				}))
			}
		}
	}

	/// Starts an already validated operation and polls it until it ends.
	async fn start_and_poll<C>(
		&self,
		client: &C,
		operation: &OperationRef,
		budget: TimeoutBudget,
		progress: &dyn ProgressSink,
		cancel: Option<&CancellationToken>,
	) -> Result<PollExit>
	where
		C: RemoteOperationClient + ?Sized,
	{
		progress.emit(ProgressEvent::stage(&operation.kind, Some(&operation.id), Stage::Starting));
		client.start(operation).await.map_err(|source| EngineError::StartFailed {
			operation: operation.id.clone(),
			source,
		})?;
		tracing::info!(operation = %operation.id, budget_secs = budget.as_duration().as_secs(), "operation.started");

		let mut state = PollState::new();
		self.refresh(client, operation, &mut state).await?;
		self.observe(operation, &state, progress);

		while !state.is_terminal() {
			if state.elapsed() > budget.as_duration() {
				tracing::error!(
					operation = %operation.id,
					budget_secs = budget.as_duration().as_secs(),
					elapsed_ms = state.elapsed().as_millis() as u64,
					"operation.timeout"
				);
				return Err(EngineError::Timeout {
					operation: operation.id.clone(),
					budget: budget.as_duration(),
					elapsed: state.elapsed(),
					last: state.last,
				});
			}

			if !self.pause(cancel).await {
				return Ok(PollExit::Canceled {
					elapsed: state.elapsed(),
					last: state.last,
				});
			}

			state.polls = state.polls.saturating_add(1);
			self.refresh(client, operation, &mut state).await?;
			self.observe(operation, &state, progress);
		}

		let elapsed = state.elapsed();
		let polls = state.polls;
		let snapshot = state.last.unwrap_or_default();
		if snapshot.status.is_terminal() && snapshot.status != OperationStatus::Finished {
			tracing::error!(operation = %operation.id, status = %snapshot.status, "operation.failed");
			return Err(EngineError::OperationFailed {
				operation: operation.id.clone(),
				status: snapshot.status,
				progress: snapshot.progress,
				elapsed,
			});
		}
		Ok(PollExit::Terminal { snapshot, elapsed, polls })
	}

	/// One status refresh, folded into `state`.
	async fn refresh<C>(&self, client: &C, operation: &OperationRef, state: &mut PollState) -> Result<()>
	where
		C: RemoteOperationClient + ?Sized,
	{
		let refreshed = match client.fetch_status(operation).await {
			Ok(refreshed) => refreshed,
			Err(source) => {
				tracing::error!(operation = %operation.id, error = %source, "operation.refresh.failed");
				return Err(EngineError::RefreshFailed {
					operation: operation.id.clone(),
					last: state.last.take(),
					elapsed: state.elapsed(),
					source,
				});
			}
		};

		if refreshed.is_none() {
			tracing::debug!(
				operation = %operation.id,
				consecutive_failures = state.consecutive_failures + 1,
				"operation.refresh.empty"
			);
		}

		state.record(refreshed, self.config.max_consecutive_failures).map_err(|Exhausted(failures)| {
			tracing::error!(operation = %operation.id, failures, "operation.refresh.exhausted");
			EngineError::PollingExhausted {
				operation: operation.id.clone(),
				failures,
				last: state.last.clone(),
				elapsed: state.elapsed(),
			}
		})
	}

	fn observe(&self, operation: &OperationRef, state: &PollState, progress: &dyn ProgressSink) {
		let last = state.last.as_ref();
		tracing::debug!(
			operation = %operation.id,
			status = ?last.map(|snapshot| snapshot.status),
			progress = ?last.and_then(|snapshot| snapshot.progress),
			elapsed_ms = state.elapsed().as_millis() as u64,
			"operation.poll"
		);
		progress.emit(ProgressEvent {
			status: last.map(|snapshot| snapshot.status),
			progress: last.and_then(|snapshot| snapshot.progress),
			elapsed: state.elapsed(),
			consecutive_failures: state.consecutive_failures,
			..ProgressEvent::stage(&operation.kind, Some(&operation.id), Stage::Polling)
		});
	}

	/// Sleeps one poll interval. Returns false when cancelled, either during
	/// the sleep or by the time it ends.
	async fn pause(&self, cancel: Option<&CancellationToken>) -> bool {
		let sleep = tokio::time::sleep(self.config.poll_interval);
		match cancel {
			Some(token) => {
				tokio::select! {
					_ = token.cancelled() => false,
					_ = sleep => !token.is_cancelled(),
				}
			}
			None => {
				sleep.await;
				true
			}
		}
	}
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
	cancel.is_some_and(CancellationToken::is_cancelled)
}
