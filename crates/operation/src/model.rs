//! Identifiers, statuses and validation entries exchanged with the remote
//! service.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::{DurationParseError, parse_iso8601_duration};

/// Identifier assigned by the remote service when an operation is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for OperationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Kind of remote work. Open for extension through [`OperationKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
	Mesh,
	SimulationRun,
	GeometryImport,
	Other(String),
}

impl OperationKind {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Mesh => "mesh",
			Self::SimulationRun => "simulation-run",
			Self::GeometryImport => "geometry-import",
			Self::Other(name) => name.as_str(),
		}
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OperationKind {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"mesh" => Self::Mesh,
			"simulation-run" => Self::SimulationRun,
			"geometry-import" => Self::GeometryImport,
			other => Self::Other(other.to_string()),
		})
	}
}

/// Identifiers of the project (and optional parent object, such as the
/// simulation a mesh or run belongs to) that address an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OperationContext {
	pub project_id: String,
	pub parent_id: Option<String>,
}

impl OperationContext {
	pub fn new(project_id: impl Into<String>) -> Self {
		Self {
			project_id: project_id.into(),
			parent_id: None,
		}
	}

	#[must_use]
	pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
		self.parent_id = Some(parent_id.into());
		self
	}
}

/// Everything a client needs to address one created operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationRef {
	pub id: OperationId,
	pub kind: OperationKind,
	pub context: OperationContext,
}

/// Remote lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
	/// Also assumed when the service omits the status.
	#[default]
	Ready,
	Queued,
	Running,
	Finished,
	Canceled,
	Failed,
}

impl OperationStatus {
	/// The service never transitions out of these.
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Finished | Self::Canceled | Self::Failed)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Ready => "READY",
			Self::Queued => "QUEUED",
			Self::Running => "RUNNING",
			Self::Finished => "FINISHED",
			Self::Canceled => "CANCELED",
			Self::Failed => "FAILED",
		}
	}
}

impl fmt::Display for OperationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returned when a status string is not one the service defines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for OperationStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"READY" => Ok(Self::Ready),
			"QUEUED" => Ok(Self::Queued),
			"RUNNING" => Ok(Self::Running),
			"FINISHED" => Ok(Self::Finished),
			"CANCELED" | "CANCELLED" => Ok(Self::Canceled),
			"FAILED" => Ok(Self::Failed),
			_ => Err(UnknownStatus(s.to_string())),
		}
	}
}

/// One observation of an operation's remote state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
	pub status: OperationStatus,
	/// Fraction complete in `[0, 1]`.
	pub progress: Option<f64>,
	/// Identifier of the object the operation produced (mesh, geometry).
	pub artifact: Option<String>,
}

impl StatusSnapshot {
	pub fn new(status: OperationStatus) -> Self {
		Self {
			status,
			progress: None,
			artifact: None,
		}
	}

	/// Builds a snapshot from a possibly missing wire status.
	pub fn from_reported(status: Option<OperationStatus>) -> Self {
		Self::new(status.unwrap_or_default())
	}

	/// Sets progress, clamped into `[0, 1]`. Non-finite values are dropped.
	#[must_use]
	pub fn with_progress(mut self, progress: f64) -> Self {
		self.progress = progress.is_finite().then(|| progress.clamp(0.0, 1.0));
		self
	}

	#[must_use]
	pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
		self.artifact = Some(artifact.into());
		self
	}

	pub const fn is_terminal(&self) -> bool {
		self.status.is_terminal()
	}
}

impl fmt::Display for StatusSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.progress {
			Some(progress) => write!(f, "{} - {:.0}%", self.status, progress * 100.0),
			None => write!(f, "{}", self.status),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
	Warning,
	Error,
}

/// One line item returned by a setup check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEntry {
	pub severity: Severity,
	pub message: String,
}

impl ValidationEntry {
	pub fn warning(message: impl Into<String>) -> Self {
		Self {
			severity: Severity::Warning,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			severity: Severity::Error,
			message: message.into(),
		}
	}

	pub const fn is_error(&self) -> bool {
		matches!(self.severity, Severity::Error)
	}
}

impl fmt::Display for ValidationEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let level = match self.severity {
			Severity::Warning => "WARNING",
			Severity::Error => "ERROR",
		};
		write!(f, "[{level}] {}", self.message)
	}
}

/// Expected duration range reported by the estimate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationInterval {
	pub min: Option<Duration>,
	pub max: Duration,
}

impl DurationInterval {
	pub fn up_to(max: Duration) -> Self {
		Self { min: None, max }
	}

	/// Parses ISO-8601 bounds as the service reports them (`PT1H30M`).
	pub fn from_iso8601(min: Option<&str>, max: &str) -> Result<Self, DurationParseError> {
		Ok(Self {
			min: min.map(parse_iso8601_duration).transpose()?,
			max: parse_iso8601_duration(max)?,
		})
	}

	pub const fn upper_bound(&self) -> Duration {
		self.max
	}
}

/// What the estimate call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Estimate {
	/// The service computed a duration range.
	Interval(DurationInterval),
	/// The service answered but did not compute a duration for this shape.
	Unavailable,
	/// The operation kind has no estimate verb at all.
	NotApplicable,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn terminal_statuses() {
		let terminal: Vec<_> = [
			OperationStatus::Ready,
			OperationStatus::Queued,
			OperationStatus::Running,
			OperationStatus::Finished,
			OperationStatus::Canceled,
			OperationStatus::Failed,
		]
		.into_iter()
		.filter(|s| s.is_terminal())
		.collect();
		assert_eq!(terminal, [OperationStatus::Finished, OperationStatus::Canceled, OperationStatus::Failed]);
	}

	#[test]
	fn missing_status_is_ready() {
		let snapshot = StatusSnapshot::from_reported(None);
		assert_eq!(snapshot.status, OperationStatus::Ready);
		assert!(!snapshot.is_terminal());
	}

	#[test]
	fn status_parsing_accepts_wire_spelling() {
		assert_eq!("FINISHED".parse::<OperationStatus>(), Ok(OperationStatus::Finished));
		assert_eq!("running".parse::<OperationStatus>(), Ok(OperationStatus::Running));
		assert_eq!("CANCELLED".parse::<OperationStatus>(), Ok(OperationStatus::Canceled));
		assert_eq!("DONE".parse::<OperationStatus>(), Err(UnknownStatus("DONE".into())));
	}

	#[test]
	fn progress_is_clamped() {
		assert_eq!(StatusSnapshot::new(OperationStatus::Running).with_progress(1.5).progress, Some(1.0));
		assert_eq!(StatusSnapshot::new(OperationStatus::Running).with_progress(-0.2).progress, Some(0.0));
		assert_eq!(StatusSnapshot::new(OperationStatus::Running).with_progress(f64::NAN).progress, None);
	}

	#[test]
	fn interval_from_iso8601_bounds() {
		let interval = DurationInterval::from_iso8601(Some("PT10M"), "PT1H30M").unwrap();
		assert_eq!(interval.min, Some(Duration::from_secs(600)));
		assert_eq!(interval.upper_bound(), Duration::from_secs(5400));
	}

	#[test]
	fn kind_round_trips_through_str() {
		for kind in [OperationKind::Mesh, OperationKind::SimulationRun, OperationKind::GeometryImport] {
			assert_eq!(kind.as_str().parse::<OperationKind>(), Ok(kind));
		}
		assert_eq!("report".parse::<OperationKind>(), Ok(OperationKind::Other("report".into())));
	}
}
