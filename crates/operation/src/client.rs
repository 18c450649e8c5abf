//! The capability the engine drives, one implementation per operation kind.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::model::{Estimate, OperationContext, OperationId, OperationKind, OperationRef, StatusSnapshot, ValidationEntry};

/// A request to create and run one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationRequest<S> {
	/// Display name given to the remote object ("APIMesh", "Run 1").
	pub name: String,
	pub context: OperationContext,
	/// Kind-specific creation payload.
	pub spec: S,
}

impl<S> OperationRequest<S> {
	pub fn new(name: impl Into<String>, context: OperationContext, spec: S) -> Self {
		Self {
			name: name.into(),
			context,
			spec,
		}
	}

	/// Identity under which in-flight cancellable runs are shared.
	pub fn key(&self, kind: OperationKind) -> OperationKey {
		OperationKey {
			kind,
			context: self.context.clone(),
			name: self.name.clone(),
		}
	}
}

/// Identity of a submission before the service has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
	pub kind: OperationKind,
	pub context: OperationContext,
	pub name: String,
}

/// Remote verbs for one kind of long-running operation.
///
/// Implementations must be safe for concurrent use by several runs and must
/// not keep per-run state; the engine owns all run state.
#[async_trait]
pub trait RemoteOperationClient: Send + Sync + 'static {
	/// Creation payload.
	type Spec: Send + Sync + 'static;

	fn kind(&self) -> OperationKind;

	/// Creates the remote object and returns its service-assigned id.
	async fn create(&self, context: &OperationContext, name: &str, spec: &Self::Spec) -> Result<OperationId, ClientError>;

	/// Runs the pre-flight setup check.
	///
	/// Kinds without a check report no entries.
	async fn check_setup(&self, operation: &OperationRef) -> Result<Vec<ValidationEntry>, ClientError> {
		let _ = operation;
		Ok(Vec::new())
	}

	/// Asks the service how long the operation is expected to take.
	///
	/// Kinds without an estimate verb report [`Estimate::NotApplicable`].
	async fn estimate(&self, operation: &OperationRef) -> Result<Estimate, ClientError> {
		let _ = operation;
		Ok(Estimate::NotApplicable)
	}

	async fn start(&self, operation: &OperationRef) -> Result<(), ClientError>;

	/// Reads the current remote status.
	///
	/// `Ok(None)` is a transient miss (no answer, empty body) and is retried;
	/// `Err` is a definitive failure and ends the run.
	async fn fetch_status(&self, operation: &OperationRef) -> Result<Option<StatusSnapshot>, ClientError>;
}
