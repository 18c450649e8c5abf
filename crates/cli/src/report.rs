use simrun_operation::{ChainOutcome, Completion, EngineError, Outcome, ProgressEvent, RunResult, Stage};

pub fn print_progress(event: ProgressEvent) {
	let id = event.operation.as_ref().map_or("-", |id| id.as_str());
	match (event.stage, event.status) {
		(Stage::Polling, Some(status)) => match event.progress {
			Some(progress) => eprintln!("[{}] {id} {status} {:.0}% ({}s)", event.kind, progress * 100.0, event.elapsed.as_secs()),
			None => eprintln!("[{}] {id} {status} ({}s)", event.kind, event.elapsed.as_secs()),
		},
		(Stage::Polling, None) => eprintln!("[{}] {id} no status ({} in a row)", event.kind, event.consecutive_failures),
		(stage, _) => eprintln!("[{}] {id} {stage:?}", event.kind),
	}
}

fn print_completion(completion: &Completion) {
	println!(
		"{} {} {} after {}s ({} polls, budget {}s)",
		completion.operation.kind,
		completion.operation.id,
		completion.snapshot.status,
		completion.elapsed.as_secs(),
		completion.polls,
		completion.budget.as_secs()
	);
	if let Some(artifact) = completion.artifact() {
		println!("  produced {artifact}");
	}
}

pub fn print_result(result: &RunResult) {
	match result {
		Ok(outcome) => {
			for warning in outcome.warnings() {
				println!("warning: {warning}");
			}
			match outcome {
				Outcome::Finished(completion) => print_completion(completion),
				Outcome::Canceled(cancellation) => {
					let id = cancellation.operation.as_ref().map_or("-", |op| op.id.as_str());
					println!("{id} canceled after {}s", cancellation.elapsed.as_secs());
				}
			}
		}
		Err(err) => print_error(err),
	}
}

fn print_error(err: &EngineError) {
	println!("error: {err}");
	if let EngineError::SetupValidationFailed { errors, warnings, .. } = err {
		for entry in errors.iter().chain(warnings) {
			println!("  {entry}");
		}
	}
	if let Some(status) = err.last_status() {
		println!("  last status {status}");
	}
}

pub fn print_chain(outcome: &ChainOutcome) {
	for warning in outcome.warnings() {
		println!("warning: {warning}");
	}
	match outcome {
		ChainOutcome::Finished { first, second, .. } => {
			print_completion(first);
			print_completion(second);
		}
		ChainOutcome::Canceled { first, cancellation } => {
			if let Some(first) = first {
				print_completion(first);
			}
			println!("chain canceled after {}s", cancellation.elapsed.as_secs());
		}
	}
}
