//! Turns the service's duration estimate into a timeout budget.

use std::time::Duration;

use crate::client::RemoteOperationClient;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::{DurationInterval, Estimate, OperationRef};
use crate::outcome::EstimateGap;

/// Maximum wall-clock time to wait for a terminal status. Never below the
/// configured floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeoutBudget(Duration);

impl TimeoutBudget {
	/// `max(floor, multiplier × upper bound)`.
	///
	/// A product that is not a positive number counts as zero; one too large
	/// for a [`Duration`] saturates.
	pub fn from_interval(config: &EngineConfig, interval: &DurationInterval) -> Self {
		let product = interval.upper_bound().as_secs_f64() * config.timeout_multiplier;
		let scaled = if product.is_nan() || product <= 0.0 {
			Duration::ZERO
		} else {
			Duration::try_from_secs_f64(product).unwrap_or(Duration::MAX)
		};
		Self(scaled.max(config.timeout_floor))
	}

	/// Budget used when no estimate is available.
	pub fn fallback(config: &EngineConfig) -> Self {
		Self(config.fallback_timeout.max(config.timeout_floor))
	}

	pub const fn as_duration(self) -> Duration {
		self.0
	}
}

/// How a budget was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetSource {
	Estimated(DurationInterval),
	/// The estimate was missing or rejected; a warning should be surfaced.
	Fallback(EstimateGap),
	/// The kind has no estimate verb; the fallback applies silently.
	Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetDecision {
	pub budget: TimeoutBudget,
	pub source: BudgetSource,
}

impl BudgetDecision {
	/// Decides the budget from what the estimate call produced.
	pub fn from_estimate(config: &EngineConfig, estimate: Estimate) -> Self {
		match estimate {
			Estimate::Interval(interval) => Self {
				budget: TimeoutBudget::from_interval(config, &interval),
				source: BudgetSource::Estimated(interval),
			},
			Estimate::Unavailable => Self {
				budget: TimeoutBudget::fallback(config),
				source: BudgetSource::Fallback(EstimateGap::NoDuration),
			},
			Estimate::NotApplicable => Self {
				budget: TimeoutBudget::fallback(config),
				source: BudgetSource::Fixed,
			},
		}
	}

	/// Gap to report as a warning, if any.
	pub fn gap(&self) -> Option<EstimateGap> {
		match self.source {
			BudgetSource::Fallback(gap) => Some(gap),
			BudgetSource::Estimated(_) | BudgetSource::Fixed => None,
		}
	}
}

/// Requests an estimate and decides the budget. Not retried.
///
/// An API error carrying the configured "unsupported" code degrades to the
/// fallback budget. Every other error is fatal.
pub async fn estimate_budget<C>(client: &C, operation: &OperationRef, config: &EngineConfig) -> Result<BudgetDecision>
where
	C: RemoteOperationClient + ?Sized,
{
	let decision = match client.estimate(operation).await {
		Ok(estimate) => BudgetDecision::from_estimate(config, estimate),
		Err(err) if err.code() == Some(config.unsupported_estimate_code) => {
			tracing::debug!(operation = %operation.id, error = %err, "operation.estimate.unsupported");
			BudgetDecision {
				budget: TimeoutBudget::fallback(config),
				source: BudgetSource::Fallback(EstimateGap::Unsupported {
					code: config.unsupported_estimate_code,
				}),
			}
		}
		Err(source) => {
			return Err(EngineError::EstimationFailed {
				operation: operation.id.clone(),
				source,
			});
		}
	};

	match decision.source {
		BudgetSource::Estimated(interval) => tracing::info!(
			operation = %operation.id,
			upper_bound_secs = interval.upper_bound().as_secs(),
			budget_secs = decision.budget.as_duration().as_secs(),
			"operation.estimate"
		),
		BudgetSource::Fallback(gap) => tracing::warn!(
			operation = %operation.id,
			?gap,
			budget_secs = decision.budget.as_duration().as_secs(),
			"operation.estimate.fallback"
		),
		BudgetSource::Fixed => tracing::debug!(
			operation = %operation.id,
			budget_secs = decision.budget.as_duration().as_secs(),
			"operation.estimate.fixed"
		),
	}

	Ok(decision)
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	fn secs(budget: TimeoutBudget) -> u64 {
		budget.as_duration().as_secs()
	}

	#[test]
	fn short_estimate_is_raised_to_floor() {
		let config = EngineConfig::default();
		let interval = DurationInterval::up_to(Duration::from_secs(1000));
		assert_eq!(secs(TimeoutBudget::from_interval(&config, &interval)), 3600);
	}

	#[test]
	fn long_estimate_is_doubled() {
		let config = EngineConfig::default();
		let interval = DurationInterval::up_to(Duration::from_secs(5000));
		assert_eq!(secs(TimeoutBudget::from_interval(&config, &interval)), 10_000);
	}

	#[test]
	fn missing_duration_falls_back_with_gap() {
		let decision = BudgetDecision::from_estimate(&EngineConfig::default(), Estimate::Unavailable);
		assert_eq!(secs(decision.budget), 36_000);
		assert_eq!(decision.gap(), Some(EstimateGap::NoDuration));
	}

	#[test]
	fn not_applicable_falls_back_silently() {
		let decision = BudgetDecision::from_estimate(&EngineConfig::default(), Estimate::NotApplicable);
		assert_eq!(secs(decision.budget), 36_000);
		assert_eq!(decision.gap(), None);
	}

	#[test]
	fn enormous_estimate_saturates() {
		let interval = DurationInterval::up_to(Duration::MAX);
		assert_eq!(TimeoutBudget::from_interval(&EngineConfig::default(), &interval).as_duration(), Duration::MAX);
	}

	#[test]
	fn unusable_multiplier_falls_to_floor() {
		let interval = DurationInterval::up_to(Duration::from_secs(1000));
		for multiplier in [-1.0, f64::NAN, 0.0] {
			let config = EngineConfig::default().timeout_multiplier(multiplier);
			assert_eq!(secs(TimeoutBudget::from_interval(&config, &interval)), 3600, "multiplier {multiplier}");
		}
	}

	proptest! {
		#[test]
		fn budget_never_below_floor(upper in 0u64..1_000_000, floor in 1u64..100_000, multiplier in 1.0f64..10.0) {
			let config = EngineConfig::default()
				.timeout_floor(Duration::from_secs(floor))
				.timeout_multiplier(multiplier);
			let budget = TimeoutBudget::from_interval(&config, &DurationInterval::up_to(Duration::from_secs(upper)));
			prop_assert!(budget.as_duration() >= config.timeout_floor);
			prop_assert!(TimeoutBudget::fallback(&config).as_duration() >= config.timeout_floor);
		}

		#[test]
		fn default_budget_is_max_of_floor_and_double(upper in 0u64..1_000_000) {
			let config = EngineConfig::default();
			let budget = TimeoutBudget::from_interval(&config, &DurationInterval::up_to(Duration::from_secs(upper)));
			prop_assert_eq!(budget.as_duration(), Duration::from_secs(3600.max(2 * upper)));
		}
	}
}
