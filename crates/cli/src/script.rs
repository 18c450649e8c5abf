//! Parses command-line scripts into a [`ScriptedClient`].

use anyhow::{Context, bail};
use simrun_operation::scripted::{Refresh, ScriptedClient};
use simrun_operation::{ClientError, DurationInterval, Estimate, OperationKind, OperationStatus, StatusSnapshot, ValidationEntry};

pub fn parse_refreshes(script: &str) -> anyhow::Result<Vec<Refresh>> {
	script.split(',').map(str::trim).filter(|entry| !entry.is_empty()).map(parse_refresh).collect()
}

fn parse_refresh(entry: &str) -> anyhow::Result<Refresh> {
	if entry == "-" {
		return Ok(Refresh::Transient);
	}
	if let Some(code) = entry.strip_prefix('!') {
		return Ok(Refresh::Error(api_error(code)?));
	}

	let (status, progress) = match entry.split_once(':') {
		Some((status, progress)) => (status, Some(progress)),
		None => (entry, None),
	};
	let status: OperationStatus = status.parse()?;
	let mut snapshot = StatusSnapshot::new(status);
	if let Some(progress) = progress {
		let progress: f64 = progress.parse().with_context(|| format!("invalid progress in {entry:?}"))?;
		snapshot = snapshot.with_progress(progress);
	}
	Ok(Refresh::Status(snapshot))
}

pub fn parse_check(entries: &str) -> anyhow::Result<Vec<ValidationEntry>> {
	entries
		.split(',')
		.map(str::trim)
		.filter(|entry| !entry.is_empty())
		.map(|entry| match entry.split_once(':') {
			Some(("warn" | "warning", message)) => Ok(ValidationEntry::warning(message)),
			Some(("error", message)) => Ok(ValidationEntry::error(message)),
			_ => bail!("check entry {entry:?} must start with `warn:` or `error:`"),
		})
		.collect()
}

pub enum EstimateScript {
	Answer(Estimate),
	Reject(ClientError),
}

pub fn parse_estimate(spec: &str) -> anyhow::Result<EstimateScript> {
	let spec = spec.trim();
	if let Some(code) = spec.strip_prefix('!') {
		return Ok(EstimateScript::Reject(api_error(code)?));
	}
	if spec == "-" {
		return Ok(EstimateScript::Answer(Estimate::Unavailable));
	}
	let interval = DurationInterval::from_iso8601(None, spec)?;
	Ok(EstimateScript::Answer(Estimate::Interval(interval)))
}

fn api_error(code: &str) -> anyhow::Result<ClientError> {
	let code: u16 = code.parse().with_context(|| format!("invalid status code {code:?}"))?;
	Ok(ClientError::api(code, "scripted error response"))
}

/// Builds a client for `kind`. Check and estimate are only answered when
/// given, so kinds without those verbs behave as they do remotely.
pub fn client(kind: OperationKind, refreshes: &str, check: Option<&str>, estimate: Option<&str>) -> anyhow::Result<ScriptedClient> {
	let mut client = ScriptedClient::new(kind)
		.with_artifact("artifact-1")
		.with_refreshes(parse_refreshes(refreshes)?);
	if let Some(check) = check {
		client = client.with_check(parse_check(check)?);
	}
	match estimate.map(parse_estimate).transpose()? {
		Some(EstimateScript::Answer(estimate)) => client = client.with_estimate(estimate),
		Some(EstimateScript::Reject(err)) => client = client.with_estimate_error(err),
		None => {}
	}
	Ok(client)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn refresh_entries() {
		let refreshes = parse_refreshes("QUEUED, running:0.25, -, !503").unwrap();
		assert_eq!(
			refreshes,
			vec![
				Refresh::status(OperationStatus::Queued),
				Refresh::Status(StatusSnapshot::new(OperationStatus::Running).with_progress(0.25)),
				Refresh::Transient,
				Refresh::Error(ClientError::api(503, "scripted error response")),
			]
		);
	}

	#[test]
	fn unknown_status_is_rejected() {
		assert!(parse_refreshes("DONE").is_err());
	}

	#[test]
	fn check_entries() {
		let entries = parse_check("warn:coarse,error:no material").unwrap();
		assert_eq!(entries, vec![ValidationEntry::warning("coarse"), ValidationEntry::error("no material")]);
		assert!(parse_check("fatal:x").is_err());
	}

	#[test]
	fn estimate_forms() {
		assert!(matches!(
			parse_estimate("PT1H").unwrap(),
			EstimateScript::Answer(Estimate::Interval(interval)) if interval.max == Duration::from_secs(3_600)
		));
		assert!(matches!(parse_estimate("-").unwrap(), EstimateScript::Answer(Estimate::Unavailable)));
		assert!(matches!(
			parse_estimate("!422").unwrap(),
			EstimateScript::Reject(err) if err.code() == Some(422)
		));
	}
}
