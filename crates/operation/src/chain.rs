//! Runs of one operation that depend on the result of another, such as a
//! simulation run configured from a finished mesh.

use tokio_util::sync::CancellationToken;

use crate::client::{OperationRequest, RemoteOperationClient};
use crate::engine::PollingEngine;
use crate::error::{EngineError, Result};
use crate::outcome::{Cancellation, Completion, Outcome, RunWarning};
use crate::progress::ProgressSink;

/// Result of [`run_chained`].
#[derive(Debug, Clone)]
pub enum ChainOutcome {
	/// Both operations reached `FINISHED`.
	Finished {
		first: Completion,
		second: Completion,
		/// Warnings of both runs, first run first.
		warnings: Vec<RunWarning>,
	},
	/// Cancelled during either run. `first` is set once the first run has
	/// finished.
	Canceled {
		first: Option<Completion>,
		cancellation: Cancellation,
	},
}

impl ChainOutcome {
	pub fn is_finished(&self) -> bool {
		matches!(self, Self::Finished { .. })
	}

	pub fn warnings(&self) -> &[RunWarning] {
		match self {
			Self::Finished { warnings, .. } => warnings,
			Self::Canceled { cancellation, .. } => &cancellation.warnings,
		}
	}
}

/// One step of a chain: the engine policy and the client that drives it.
pub struct ChainStep<'a, C: ?Sized> {
	pub engine: &'a PollingEngine,
	pub client: &'a C,
}

impl<C: ?Sized> Clone for ChainStep<'_, C> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<C: ?Sized> Copy for ChainStep<'_, C> {}

impl<'a, C: ?Sized> ChainStep<'a, C> {
	pub fn new(engine: &'a PollingEngine, client: &'a C) -> Self {
		Self { engine, client }
	}
}

/// Runs `first_request` to completion, then the request `derive` builds from
/// its result.
///
/// Each step keeps its own budget and policy. A failure of either step is
/// returned unchanged; a `derive` error becomes
/// [`EngineError::ChainBroken`] and the second operation is never created.
pub async fn run_chained<A, B, D>(
	first: ChainStep<'_, A>,
	first_request: &OperationRequest<A::Spec>,
	second: ChainStep<'_, B>,
	derive: D,
	progress: &dyn ProgressSink,
	cancel: Option<&CancellationToken>,
) -> Result<ChainOutcome>
where
	A: RemoteOperationClient + ?Sized,
	B: RemoteOperationClient + ?Sized,
	D: FnOnce(&Completion) -> std::result::Result<OperationRequest<B::Spec>, String>,
{
	let first_done = match first.engine.run(first.client, first_request, progress, cancel).await? {
		Outcome::Finished(completion) => completion,
		Outcome::Canceled(cancellation) => {
			return Ok(ChainOutcome::Canceled {
				first: None,
				cancellation,
			});
		}
	};

	let second_request = derive(&first_done).map_err(|reason| {
		tracing::error!(operation = %first_done.operation.id, %reason, "operation.chain.broken");
		EngineError::ChainBroken {
			operation: first_done.operation.id.clone(),
			reason,
		}
	})?;
	tracing::info!(
		first = %first_done.operation.id,
		next = %second.client.kind(),
		name = %second_request.name,
		"operation.chain.next"
	);

	match second.engine.run(second.client, &second_request, progress, cancel).await? {
		Outcome::Finished(second_done) => {
			let warnings = first_done.warnings.iter().chain(&second_done.warnings).cloned().collect();
			Ok(ChainOutcome::Finished {
				first: first_done,
				second: second_done,
				warnings,
			})
		}
		Outcome::Canceled(mut cancellation) => {
			let mut warnings = first_done.warnings.clone();
			warnings.append(&mut cancellation.warnings);
			cancellation.warnings = warnings;
			Ok(ChainOutcome::Canceled {
				first: Some(first_done),
				cancellation,
			})
		}
	}
}
