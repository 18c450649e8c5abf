//! Blocking, detached and cancellable wrappers over one [`PollingEngine`].

mod blocking;
mod detached;
mod task;

use std::sync::Arc;

pub use blocking::run_blocking;
pub use detached::spawn_detached;
pub use task::{OperationTask, spawn_cancellable};

use simrun_worker::InFlight;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::client::{OperationKey, OperationRequest, RemoteOperationClient};
use crate::config::{ConfigError, EngineConfig};
use crate::engine::PollingEngine;
use crate::outcome::RunResult;
use crate::progress::{NoProgress, ProgressSink};

/// Entry point for callers: one engine policy, three ways to run it.
///
/// Clones share the engine and the registry of in-flight cancellable runs.
#[derive(Clone, Default)]
pub struct Executor {
	engine: Arc<PollingEngine>,
	in_flight: InFlight<OperationKey, OperationTask>,
}

impl std::fmt::Debug for Executor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Executor")
			.field("config", self.engine.config())
			.field("in_flight", &self.in_flight.len())
			.finish()
	}
}

impl Executor {
	/// Fails when `config` does not pass [`EngineConfig::validate`].
	pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			engine: Arc::new(PollingEngine::new(config)?),
			in_flight: InFlight::new(),
		})
	}

	pub fn engine(&self) -> &PollingEngine {
		&self.engine
	}

	/// Runs on the calling thread and returns the outcome directly.
	pub fn run<C>(&self, client: &C, request: &OperationRequest<C::Spec>) -> RunResult
	where
		C: RemoteOperationClient + ?Sized,
	{
		run_blocking(&self.engine, client, request, &NoProgress)
	}

	/// Like [`Self::run`], reporting progress to `progress` as it happens.
	pub fn run_with_progress<C>(&self, client: &C, request: &OperationRequest<C::Spec>, progress: &dyn ProgressSink) -> RunResult
	where
		C: RemoteOperationClient + ?Sized,
	{
		run_blocking(&self.engine, client, request, progress)
	}

	/// Fire-and-forget: `on_complete` receives the result exactly once, on a
	/// worker thread.
	pub fn run_detached<C, F>(&self, client: Arc<C>, request: OperationRequest<C::Spec>, on_complete: F)
	where
		C: RemoteOperationClient,
		F: FnOnce(RunResult) + Send + 'static,
	{
		spawn_detached(Arc::clone(&self.engine), client, request, on_complete);
	}

	/// Fire-and-forget with the result delivered through a channel, for
	/// callers that marshal completion back onto their own thread or task.
	pub fn run_detached_channel<C>(&self, client: Arc<C>, request: OperationRequest<C::Spec>) -> oneshot::Receiver<RunResult>
	where
		C: RemoteOperationClient,
	{
		let (tx, rx) = oneshot::channel();
		self.run_detached(client, request, move |result| {
			let _ = tx.send(result);
		});
		rx
	}

	/// Cancellable run with progress; joins the in-flight run for the same
	/// request identity instead of submitting a duplicate.
	pub fn run_cancellable<C>(&self, client: Arc<C>, request: OperationRequest<C::Spec>, cancel: CancellationToken) -> OperationTask
	where
		C: RemoteOperationClient,
	{
		spawn_cancellable(Arc::clone(&self.engine), &self.in_flight, client, request, cancel)
	}

	/// True when no cancellable run is in flight.
	pub fn is_idle(&self) -> bool {
		self.in_flight.is_empty()
	}

	/// Cancellable run currently in flight for `key`.
	pub fn in_flight(&self, key: &OperationKey) -> Option<OperationTask> {
		self.in_flight.get(key)
	}
}
