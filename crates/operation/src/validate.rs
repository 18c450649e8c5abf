//! Setup validation: partition check entries and fail fast on errors.

use crate::client::RemoteOperationClient;
use crate::error::{EngineError, Result};
use crate::model::{OperationRef, ValidationEntry};

/// Entries of one setup check, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
	pub errors: Vec<ValidationEntry>,
	pub warnings: Vec<ValidationEntry>,
}

impl ValidationReport {
	pub fn from_entries(entries: impl IntoIterator<Item = ValidationEntry>) -> Self {
		let (errors, warnings) = entries.into_iter().partition(ValidationEntry::is_error);
		Self { errors, warnings }
	}

	/// A check passes iff it returned no ERROR entries.
	pub fn passed(&self) -> bool {
		self.errors.is_empty()
	}

	/// Returns the warnings of a passed check, or the full failure.
	pub fn into_result(self, operation: &OperationRef) -> Result<Vec<ValidationEntry>> {
		if self.passed() {
			Ok(self.warnings)
		} else {
			Err(EngineError::SetupValidationFailed {
				operation: operation.id.clone(),
				errors: self.errors,
				warnings: self.warnings,
			})
		}
	}
}

/// Runs the client's setup check for `operation` and returns its warnings.
///
/// Any ERROR entry fails with [`EngineError::SetupValidationFailed`]; the
/// caller must not estimate or start the operation afterwards.
pub async fn check_setup<C>(client: &C, operation: &OperationRef) -> Result<Vec<ValidationEntry>>
where
	C: RemoteOperationClient + ?Sized,
{
	let entries = client.check_setup(operation).await.map_err(|source| EngineError::CheckFailed {
		operation: operation.id.clone(),
		source,
	})?;

	let report = ValidationReport::from_entries(entries);
	for entry in &report.warnings {
		tracing::warn!(operation = %operation.id, kind = %operation.kind, message = %entry.message, "operation.check.warning");
	}
	for entry in &report.errors {
		tracing::error!(operation = %operation.id, kind = %operation.kind, message = %entry.message, "operation.check.error");
	}
	tracing::debug!(
		operation = %operation.id,
		errors = report.errors.len(),
		warnings = report.warnings.len(),
		"operation.check"
	);

	report.into_result(operation)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{OperationContext, OperationId, OperationKind};

	fn operation() -> OperationRef {
		OperationRef {
			id: OperationId::new("mesh-1"),
			kind: OperationKind::Mesh,
			context: OperationContext::new("project"),
		}
	}

	#[test]
	fn warnings_only_pass() {
		let report = ValidationReport::from_entries([ValidationEntry::warning("coarse"), ValidationEntry::warning("thin wall")]);
		assert!(report.passed());
		assert_eq!(report.into_result(&operation()).unwrap().len(), 2);
	}

	#[test]
	fn empty_check_passes() {
		let report = ValidationReport::from_entries([]);
		assert!(report.passed());
		assert!(report.into_result(&operation()).unwrap().is_empty());
	}

	#[test]
	fn single_error_fails_with_all_entries() {
		let report = ValidationReport::from_entries([
			ValidationEntry::warning("coarse"),
			ValidationEntry::error("no material"),
			ValidationEntry::warning("thin wall"),
		]);
		assert!(!report.passed());
		match report.into_result(&operation()) {
			Err(EngineError::SetupValidationFailed { operation, errors, warnings }) => {
				assert_eq!(operation.as_str(), "mesh-1");
				assert_eq!(errors, [ValidationEntry::error("no material")]);
				assert_eq!(warnings.len(), 2);
			}
			other => panic!("expected validation failure, got {other:?}"),
		}
	}
}
