//! In-memory [`RemoteOperationClient`] that replays a fixed script.
//!
//! Used by the test suites and the command-line demo. Every call is
//! recorded so callers can assert on what the engine asked for.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::RemoteOperationClient;
use crate::error::ClientError;
use crate::model::{Estimate, OperationContext, OperationId, OperationKind, OperationRef, OperationStatus, StatusSnapshot, ValidationEntry};

/// One scripted answer to `fetch_status`.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
	Status(StatusSnapshot),
	/// No usable answer; the engine retries.
	Transient,
	Error(ClientError),
}

impl Refresh {
	pub fn status(status: OperationStatus) -> Self {
		Self::Status(StatusSnapshot::new(status))
	}
}

/// A recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Create { name: String, spec: String },
	CheckSetup(OperationId),
	Estimate(OperationId),
	Start(OperationId),
	FetchStatus(OperationId),
}

#[derive(Debug, Default)]
struct Log {
	calls: Vec<Call>,
	created: u32,
	refresh_cursor: usize,
}

/// Scripted client for one [`OperationKind`].
///
/// Refreshes are answered from the script in order; once it runs out the
/// last entry repeats. An empty script answers [`Refresh::Transient`].
#[derive(Debug)]
pub struct ScriptedClient {
	kind: OperationKind,
	create_error: Option<ClientError>,
	check: Option<Result<Vec<ValidationEntry>, ClientError>>,
	estimate: Option<Result<Estimate, ClientError>>,
	estimate_delay: Duration,
	start_error: Option<ClientError>,
	start_delay: Duration,
	refreshes: Vec<Refresh>,
	artifact: Option<String>,
	log: Mutex<Log>,
}

impl ScriptedClient {
	pub fn new(kind: OperationKind) -> Self {
		Self {
			kind,
			create_error: None,
			check: None,
			estimate: None,
			estimate_delay: Duration::ZERO,
			start_error: None,
			start_delay: Duration::ZERO,
			refreshes: Vec::new(),
			artifact: None,
			log: Mutex::new(Log::default()),
		}
	}

	pub fn with_create_error(mut self, error: ClientError) -> Self {
		self.create_error = Some(error);
		self
	}

	/// Answers the setup check with `entries`. Without this the kind behaves
	/// as one that has no check.
	pub fn with_check(mut self, entries: Vec<ValidationEntry>) -> Self {
		self.check = Some(Ok(entries));
		self
	}

	pub fn with_check_error(mut self, error: ClientError) -> Self {
		self.check = Some(Err(error));
		self
	}

	/// Answers the estimate call with `estimate`. Without this the kind
	/// behaves as one that has no estimate verb.
	pub fn with_estimate(mut self, estimate: Estimate) -> Self {
		self.estimate = Some(Ok(estimate));
		self
	}

	pub fn with_estimate_error(mut self, error: ClientError) -> Self {
		self.estimate = Some(Err(error));
		self
	}

	/// Makes the estimate call take `delay` before answering.
	pub fn with_estimate_delay(mut self, delay: Duration) -> Self {
		self.estimate_delay = delay;
		self
	}

	/// Makes the start call take `delay` before answering.
	pub fn with_start_delay(mut self, delay: Duration) -> Self {
		self.start_delay = delay;
		self
	}

	pub fn with_start_error(mut self, error: ClientError) -> Self {
		self.start_error = Some(error);
		self
	}

	pub fn with_refreshes(mut self, refreshes: impl IntoIterator<Item = Refresh>) -> Self {
		self.refreshes = refreshes.into_iter().collect();
		self
	}

	/// Attaches `artifact` to every `FINISHED` snapshot that lacks one.
	pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
		self.artifact = Some(artifact.into());
		self
	}

	pub fn calls(&self) -> Vec<Call> {
		self.log.lock().calls.clone()
	}

	pub fn created(&self) -> u32 {
		self.log.lock().created
	}

	pub fn fetch_count(&self) -> usize {
		self.count(|call| matches!(call, Call::FetchStatus(_)))
	}

	pub fn started(&self) -> bool {
		self.count(|call| matches!(call, Call::Start(_))) > 0
	}

	fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
		self.log.lock().calls.iter().filter(|call| pred(call)).count()
	}

	fn record(&self, call: Call) {
		self.log.lock().calls.push(call);
	}

	fn next_refresh(&self) -> Refresh {
		let mut log = self.log.lock();
		let index = log.refresh_cursor.min(self.refreshes.len().saturating_sub(1));
		log.refresh_cursor = log.refresh_cursor.saturating_add(1);
		match self.refreshes.get(index) {
			Some(refresh) => refresh.clone(),
			None => Refresh::Transient,
		}
	}
}

#[async_trait]
impl RemoteOperationClient for ScriptedClient {
	type Spec = String;

	fn kind(&self) -> OperationKind {
		self.kind.clone()
	}

	async fn create(&self, context: &OperationContext, name: &str, spec: &Self::Spec) -> Result<OperationId, ClientError> {
		let mut log = self.log.lock();
		log.calls.push(Call::Create {
			name: name.to_string(),
			spec: spec.clone(),
		});
		if let Some(err) = &self.create_error {
			return Err(err.clone());
		}
		log.created += 1;
		Ok(OperationId::new(format!("{}-{}-{}", context.project_id, self.kind, log.created)))
	}

	async fn check_setup(&self, operation: &OperationRef) -> Result<Vec<ValidationEntry>, ClientError> {
		self.record(Call::CheckSetup(operation.id.clone()));
		self.check.clone().unwrap_or_else(|| Ok(Vec::new()))
	}

	async fn estimate(&self, operation: &OperationRef) -> Result<Estimate, ClientError> {
		self.record(Call::Estimate(operation.id.clone()));
		pause(self.estimate_delay).await;
		self.estimate.clone().unwrap_or(Ok(Estimate::NotApplicable))
	}

	async fn start(&self, operation: &OperationRef) -> Result<(), ClientError> {
		self.record(Call::Start(operation.id.clone()));
		pause(self.start_delay).await;
		match &self.start_error {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}

	async fn fetch_status(&self, operation: &OperationRef) -> Result<Option<StatusSnapshot>, ClientError> {
		self.record(Call::FetchStatus(operation.id.clone()));
		match self.next_refresh() {
			Refresh::Status(mut snapshot) => {
				if snapshot.status == OperationStatus::Finished && snapshot.artifact.is_none() {
					snapshot.artifact = self.artifact.clone();
				}
				Ok(Some(snapshot))
			}
			Refresh::Transient => Ok(None),
			Refresh::Error(err) => Err(err),
		}
	}
}

async fn pause(delay: Duration) {
	if !delay.is_zero() {
		tokio::time::sleep(delay).await;
	}
}
