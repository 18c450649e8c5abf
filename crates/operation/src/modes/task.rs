use std::sync::Arc;

use simrun_worker::{GenerationToken, InFlight, TaskClass};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::client::{OperationKey, OperationRequest, RemoteOperationClient};
use crate::engine::PollingEngine;
use crate::error::EngineError;
use crate::outcome::RunResult;
use crate::progress::ProgressEvent;

const PROGRESS_BUFFER: usize = 64;

/// Handle to a cancellable run. Clones share the same run.
#[derive(Debug, Clone)]
pub struct OperationTask {
	key: OperationKey,
	token: GenerationToken,
	result: watch::Receiver<Option<RunResult>>,
	progress: broadcast::Sender<ProgressEvent>,
}

impl OperationTask {
	pub fn key(&self) -> &OperationKey {
		&self.key
	}

	/// Generation under which this run was registered.
	pub fn generation(&self) -> u64 {
		self.token.generation()
	}

	/// Requests cooperative cancellation. The run ends with
	/// [`Outcome::Canceled`](crate::Outcome::Canceled) at its next
	/// iteration boundary.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	pub fn is_finished(&self) -> bool {
		self.result.borrow().is_some()
	}

	/// Subscribes to progress events emitted from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
		self.progress.subscribe()
	}

	/// Waits for the run to end.
	pub async fn wait(&self) -> RunResult {
		let mut result = self.result.clone();
		let finished = match result.wait_for(Option::is_some).await {
			Ok(value) => value.clone(),
			Err(_) => None,
		};
		finished.unwrap_or_else(|| Err(EngineError::runtime("operation task ended without a result")))
	}
}

/// Starts a cancellable run, or joins the one already in flight for the
/// same [`OperationKey`].
///
/// A joined caller's `cancel` token is not attached to the shared run; use
/// [`OperationTask::cancel`] on the returned handle instead.
pub fn spawn_cancellable<C>(
	engine: Arc<PollingEngine>,
	in_flight: &InFlight<OperationKey, OperationTask>,
	client: Arc<C>,
	request: OperationRequest<C::Spec>,
	cancel: CancellationToken,
) -> OperationTask
where
	C: RemoteOperationClient,
{
	let key = request.key(client.kind());
	let registry = in_flight.clone();

	let claim = in_flight.claim(key.clone(), move |generation| {
		let token = GenerationToken::new(generation, cancel);
		let (result_tx, result_rx) = watch::channel(None);
		let (progress_tx, _) = broadcast::channel(PROGRESS_BUFFER);
		let task = OperationTask {
			key: key.clone(),
			token: token.clone(),
			result: result_rx,
			progress: progress_tx.clone(),
		};

		let run = simrun_worker::spawn(TaskClass::Cancellable, async move {
			let sink = move |event: ProgressEvent| {
				let _ = progress_tx.send(event);
			};
			engine.run(client.as_ref(), &request, &sink, Some(token.token())).await
		});

		simrun_worker::spawn(TaskClass::Completion, async move {
			let result = match run.await {
				Ok(result) => result,
				Err(err) => Err(EngineError::runtime(simrun_worker::join_error_message(err))),
			};
			registry.release(&key, generation);
			let _ = result_tx.send(Some(result));
		});

		task
	});

	let joined = claim.is_joined();
	let task = claim.into_value();
	if joined {
		tracing::debug!(name = %task.key().name, generation = task.generation(), "operation.task.joined");
	}
	task
}
