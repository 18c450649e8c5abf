use std::sync::Arc;

use simrun_worker::TaskClass;

use crate::client::{OperationRequest, RemoteOperationClient};
use crate::engine::PollingEngine;
use crate::error::EngineError;
use crate::outcome::RunResult;
use crate::progress::NoProgress;

/// Runs `request` on a worker and hands the result to `on_complete`.
///
/// `on_complete` is invoked exactly once, on a worker thread, including when
/// the run panics. The run cannot be aborted once submitted.
pub fn spawn_detached<C, F>(engine: Arc<PollingEngine>, client: Arc<C>, request: OperationRequest<C::Spec>, on_complete: F)
where
	C: RemoteOperationClient,
	F: FnOnce(RunResult) + Send + 'static,
{
	let name = request.name.clone();
	let run = simrun_worker::spawn(TaskClass::Detached, async move { engine.run(client.as_ref(), &request, &NoProgress, None).await });

	simrun_worker::spawn(TaskClass::Completion, async move {
		let result = match run.await {
			Ok(result) => result,
			Err(err) => {
				let message = simrun_worker::join_error_message(err);
				tracing::error!(name = %name, %message, "operation.detached.aborted");
				Err(EngineError::runtime(message))
			}
		};
		on_complete(result);
	});
}
