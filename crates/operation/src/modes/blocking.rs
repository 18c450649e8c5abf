use simrun_worker::TaskClass;

use crate::client::{OperationRequest, RemoteOperationClient};
use crate::engine::PollingEngine;
use crate::error::EngineError;
use crate::outcome::RunResult;
use crate::progress::ProgressSink;

/// Runs `request` to completion on the calling thread.
///
/// Must not be called from inside an async runtime; that is reported as
/// [`EngineError::Runtime`] rather than stalling the executor.
pub fn run_blocking<C>(engine: &PollingEngine, client: &C, request: &OperationRequest<C::Spec>, progress: &dyn ProgressSink) -> RunResult
where
	C: RemoteOperationClient + ?Sized,
{
	simrun_worker::block_on(TaskClass::Blocking, engine.run(client, request, progress, None))
		.map_err(|err| EngineError::runtime(err.to_string()))?
}
