//! ISO-8601 durations as the remote service reports estimate bounds.

use std::time::Duration;

use thiserror::Error;

/// Returned when an estimate bound is not a supported ISO-8601 duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISO-8601 duration {input:?}: {reason}")]
pub struct DurationParseError {
	pub input: String,
	pub reason: &'static str,
}

const DATE_UNITS: &[(char, f64)] = &[('W', 604_800.0), ('D', 86_400.0)];
const TIME_UNITS: &[(char, f64)] = &[('H', 3_600.0), ('M', 60.0), ('S', 1.0)];

/// Parses `PnWnDTnHnMnS` durations such as `PT1H30M` or `P1DT0.5S`.
///
/// Calendar units (years, months) have no fixed length and are rejected.
/// Either `.` or `,` may separate a fractional part.
pub fn parse_iso8601_duration(input: &str) -> Result<Duration, DurationParseError> {
	let fail = |reason| DurationParseError {
		input: input.to_string(),
		reason,
	};

	let rest = input.trim().strip_prefix('P').ok_or_else(|| fail("missing leading 'P'"))?;
	if rest.is_empty() {
		return Err(fail("no components"));
	}

	let (date, time) = match rest.split_once('T') {
		Some((_, "")) => return Err(fail("empty time part after 'T'")),
		Some((date, time)) => (date, Some(time)),
		None => (rest, None),
	};

	let mut seconds = sum_components(date, DATE_UNITS).map_err(fail)?;
	if let Some(time) = time {
		seconds += sum_components(time, TIME_UNITS).map_err(fail)?;
	}

	Duration::try_from_secs_f64(seconds).map_err(|_| fail("value out of range"))
}

fn sum_components(part: &str, units: &[(char, f64)]) -> Result<f64, &'static str> {
	let mut total = 0.0;
	let mut number = String::new();
	let mut allowed = units;

	for ch in part.chars() {
		match ch {
			'0'..='9' | '.' => number.push(ch),
			',' => number.push('.'),
			'Y' => return Err("calendar years are not supported"),
			'M' if allowed.iter().all(|(unit, _)| *unit != 'M') => return Err("calendar months are not supported"),
			designator => {
				let Some(pos) = allowed.iter().position(|(unit, _)| *unit == designator) else {
					return Err("unexpected or out-of-order designator");
				};
				if number.is_empty() {
					return Err("designator without a value");
				}
				let value: f64 = number.parse().map_err(|_| "malformed number")?;
				total += value * allowed[pos].1;
				allowed = &allowed[pos + 1..];
				number.clear();
			}
		}
	}

	if !number.is_empty() {
		return Err("value without a designator");
	}
	Ok(total)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn secs(input: &str) -> f64 {
		parse_iso8601_duration(input).unwrap().as_secs_f64()
	}

	#[test]
	fn parses_time_components() {
		assert_eq!(secs("PT1H30M"), 5_400.0);
		assert_eq!(secs("PT45S"), 45.0);
		assert_eq!(secs("PT0.5S"), 0.5);
		assert_eq!(secs("PT2,5M"), 150.0);
	}

	#[test]
	fn parses_date_and_time_components() {
		assert_eq!(secs("P1DT2H"), 93_600.0);
		assert_eq!(secs("P1W"), 604_800.0);
		assert_eq!(secs("P2D"), 172_800.0);
	}

	#[test]
	fn rejects_malformed_input() {
		for input in ["", "1H", "P", "PT", "PT5", "PTH", "PT1S1H", "P1Y", "P1M", "PT1X", "-PT1H", "PT1..5S"] {
			assert!(parse_iso8601_duration(input).is_err(), "{input:?} should be rejected");
		}
	}

	#[test]
	fn minutes_are_time_only() {
		assert_eq!(
			parse_iso8601_duration("P3M").unwrap_err().reason,
			"calendar months are not supported"
		);
		assert_eq!(secs("PT3M"), 180.0);
	}
}
