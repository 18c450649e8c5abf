//! Polling, timeout and retry policy.
//!
//! Defaults follow the policy the remote service is used with for meshing
//! and simulation runs. Geometry imports use their own profile, see
//! [`OperationKind::default_config`]. A TOML file can override any field:
//!
//! ```toml
//! profile = "mesh"              # optional base profile
//! poll_interval_secs = 30
//! timeout_floor_secs = 3600
//! timeout_multiplier = 2.0
//! fallback_timeout_secs = 36000
//! max_consecutive_failures = 5
//! unsupported_estimate_code = 422
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::model::OperationKind;

/// Errors that can occur when loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or an unknown key.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A duration key held a negative, non-finite or oversized value.
	#[error("invalid duration for {key}: {value}")]
	InvalidDuration { key: &'static str, value: f64 },

	/// The base profile name is not a known operation kind.
	#[error("unknown profile: {0} (expected 'mesh', 'simulation-run' or 'geometry-import')")]
	UnknownProfile(String),

	#[error("poll interval must be greater than zero")]
	ZeroPollInterval,

	#[error("timeout multiplier must be finite and at least 1, got {0}")]
	InvalidMultiplier(f64),

	#[error("fallback timeout {fallback:?} is below the timeout floor {floor:?}")]
	FallbackBelowFloor { fallback: Duration, floor: Duration },
}

/// Engine policy. Every field can be overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
	/// Sleep between two status refreshes.
	pub poll_interval: Duration,
	/// Lower bound of every timeout budget.
	pub timeout_floor: Duration,
	/// Factor applied to the estimated upper bound.
	pub timeout_multiplier: f64,
	/// Budget used when no estimate is available.
	pub fallback_timeout: Duration,
	/// Consecutive empty refreshes tolerated; one more fails the run.
	pub max_consecutive_failures: u32,
	/// Status code with which the estimate call signals that estimation is
	/// not supported for the operation's configuration.
	pub unsupported_estimate_code: u16,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(30),
			timeout_floor: Duration::from_secs(3_600),
			timeout_multiplier: 2.0,
			fallback_timeout: Duration::from_secs(36_000),
			max_consecutive_failures: 5,
			unsupported_estimate_code: 422,
		}
	}
}

impl EngineConfig {
	/// Returns the policy profile for `kind`.
	pub fn for_kind(kind: &OperationKind) -> Self {
		kind.default_config()
	}

	#[must_use]
	pub fn poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	#[must_use]
	pub fn timeout_floor(mut self, floor: Duration) -> Self {
		self.timeout_floor = floor;
		self
	}

	#[must_use]
	pub fn timeout_multiplier(mut self, multiplier: f64) -> Self {
		self.timeout_multiplier = multiplier;
		self
	}

	#[must_use]
	pub fn fallback_timeout(mut self, fallback: Duration) -> Self {
		self.fallback_timeout = fallback;
		self
	}

	#[must_use]
	pub fn max_consecutive_failures(mut self, max: u32) -> Self {
		self.max_consecutive_failures = max;
		self
	}

	#[must_use]
	pub fn unsupported_estimate_code(mut self, code: u16) -> Self {
		self.unsupported_estimate_code = code;
		self
	}

	/// Checks the invariants the engine relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.poll_interval.is_zero() {
			return Err(ConfigError::ZeroPollInterval);
		}
		if !self.timeout_multiplier.is_finite() || self.timeout_multiplier < 1.0 {
			return Err(ConfigError::InvalidMultiplier(self.timeout_multiplier));
		}
		if self.fallback_timeout < self.timeout_floor {
			return Err(ConfigError::FallbackBelowFloor {
				fallback: self.fallback_timeout,
				floor: self.timeout_floor,
			});
		}
		Ok(())
	}

	/// Parses and validates a TOML document. Absent keys keep the base
	/// profile's values.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let raw: RawConfig = toml::from_str(source)?;
		let config = raw.apply()?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&source)
	}
}

impl OperationKind {
	/// Policy observed for this kind of operation.
	///
	/// Geometry imports have neither a setup check nor an estimate, and are
	/// polled every 10s against a fixed 900s budget.
	pub fn default_config(&self) -> EngineConfig {
		match self {
			Self::GeometryImport => EngineConfig::default()
				.poll_interval(Duration::from_secs(10))
				.timeout_floor(Duration::from_secs(900))
				.fallback_timeout(Duration::from_secs(900)),
			Self::Mesh | Self::SimulationRun | Self::Other(_) => EngineConfig::default(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
	profile: Option<String>,
	poll_interval_secs: Option<f64>,
	timeout_floor_secs: Option<f64>,
	timeout_multiplier: Option<f64>,
	fallback_timeout_secs: Option<f64>,
	max_consecutive_failures: Option<u32>,
	unsupported_estimate_code: Option<u16>,
}

impl RawConfig {
	fn apply(self) -> Result<EngineConfig, ConfigError> {
		let mut config = match self.profile.as_deref() {
			None => EngineConfig::default(),
			Some(name @ ("mesh" | "simulation-run" | "geometry-import")) => name
				.parse::<OperationKind>()
				.map(|kind| kind.default_config())
				.unwrap_or_default(),
			Some(other) => return Err(ConfigError::UnknownProfile(other.to_string())),
		};

		if let Some(secs) = self.poll_interval_secs {
			config.poll_interval = secs_to_duration("poll_interval_secs", secs)?;
		}
		if let Some(secs) = self.timeout_floor_secs {
			config.timeout_floor = secs_to_duration("timeout_floor_secs", secs)?;
		}
		if let Some(secs) = self.fallback_timeout_secs {
			config.fallback_timeout = secs_to_duration("fallback_timeout_secs", secs)?;
		}
		if let Some(multiplier) = self.timeout_multiplier {
			config.timeout_multiplier = multiplier;
		}
		if let Some(max) = self.max_consecutive_failures {
			config.max_consecutive_failures = max;
		}
		if let Some(code) = self.unsupported_estimate_code {
			config.unsupported_estimate_code = code;
		}
		Ok(config)
	}
}

fn secs_to_duration(key: &'static str, value: f64) -> Result<Duration, ConfigError> {
	Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { key, value })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_observed_policy() {
		let config = EngineConfig::default();
		assert_eq!(config.poll_interval, Duration::from_secs(30));
		assert_eq!(config.timeout_floor, Duration::from_secs(3600));
		assert_eq!(config.timeout_multiplier, 2.0);
		assert_eq!(config.fallback_timeout, Duration::from_secs(36_000));
		assert_eq!(config.max_consecutive_failures, 5);
		assert_eq!(config.unsupported_estimate_code, 422);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn geometry_import_profile() {
		let config = EngineConfig::for_kind(&OperationKind::GeometryImport);
		assert_eq!(config.poll_interval, Duration::from_secs(10));
		assert_eq!(config.timeout_floor, Duration::from_secs(900));
		assert_eq!(config.fallback_timeout, Duration::from_secs(900));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn toml_overrides_profile_fields() {
		let config = EngineConfig::from_toml_str(
			r#"
			profile = "geometry-import"
			poll_interval_secs = 0.5
			max_consecutive_failures = 2
			"#,
		)
		.unwrap();
		assert_eq!(config.poll_interval, Duration::from_millis(500));
		assert_eq!(config.timeout_floor, Duration::from_secs(900));
		assert_eq!(config.max_consecutive_failures, 2);
	}

	#[test]
	fn empty_document_is_default() {
		assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
	}

	#[test]
	fn rejects_invalid_documents() {
		assert!(matches!(EngineConfig::from_toml_str("poll_interval = 3"), Err(ConfigError::Toml(_))));
		assert!(matches!(
			EngineConfig::from_toml_str("profile = \"report\""),
			Err(ConfigError::UnknownProfile(name)) if name == "report"
		));
		assert!(matches!(
			EngineConfig::from_toml_str("poll_interval_secs = -1.0"),
			Err(ConfigError::InvalidDuration { key: "poll_interval_secs", .. })
		));
		assert!(matches!(EngineConfig::from_toml_str("poll_interval_secs = 0"), Err(ConfigError::ZeroPollInterval)));
		assert!(matches!(
			EngineConfig::from_toml_str("timeout_multiplier = 0.5"),
			Err(ConfigError::InvalidMultiplier(_))
		));
		assert!(matches!(
			EngineConfig::from_toml_str("fallback_timeout_secs = 60"),
			Err(ConfigError::FallbackBelowFloor { .. })
		));
	}

	#[test]
	fn loads_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("simrun.toml");
		std::fs::write(&path, "timeout_floor_secs = 1800\n").unwrap();
		let config = EngineConfig::from_path(&path).unwrap();
		assert_eq!(config.timeout_floor, Duration::from_secs(1800));

		let missing = EngineConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
		assert!(matches!(missing, ConfigError::Io { .. }));
	}
}
