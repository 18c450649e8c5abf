//! `simrun`: drives operations through the lifecycle engine against a
//! scripted service, in any of the three execution modes.

mod cli;
mod report;
mod script;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cli::{BudgetArgs, ChainArgs, Cli, Command, Mode, RunArgs};
use simrun_operation::{
	BudgetDecision, CancellationToken, ChainStep, Completion, DurationInterval, EngineConfig, Estimate, Executor, OperationContext,
	OperationKind, OperationRequest, PollingEngine, run_chained,
};
use simrun_worker::TaskClass;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	match &cli.command {
		Command::Run(args) => run(&cli, args),
		Command::Chain(args) => chain(&cli, args),
		Command::Budget(args) => budget(&cli, args),
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("simrun_operation=debug,simrun_worker=trace,info")
		} else {
			EnvFilter::new("simrun_operation=info,warn")
		}
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Policy for `kind`: the config file if given, else the kind's profile.
fn engine_config(cli: &Cli, kind: &OperationKind) -> anyhow::Result<EngineConfig> {
	let mut config = match &cli.config {
		Some(path) => EngineConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?,
		None => EngineConfig::for_kind(kind),
	};
	if let Some(ms) = cli.interval_ms {
		config = config.poll_interval(Duration::from_millis(ms));
	}
	Ok(config)
}

fn run(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
	let kind: OperationKind = args.kind.parse()?;
	let executor = Executor::new(engine_config(cli, &kind)?)?;
	let client = Arc::new(script::client(kind, &args.script, args.check.as_deref(), args.estimate.as_deref())?);
	let request = OperationRequest::new(args.name.as_str(), OperationContext::new(args.project.as_str()), String::new());

	if args.cancel_after.is_some() && args.mode != Mode::Task {
		anyhow::bail!("--cancel-after needs --mode task");
	}

	let result = match args.mode {
		Mode::Blocking => executor.run_with_progress(client.as_ref(), &request, &report::print_progress),
		Mode::Detached => {
			let (tx, rx) = tokio::sync::oneshot::channel();
			executor.run_detached(client, request, move |result| {
				tracing::debug!(finished = result.is_ok(), "simrun.detached.callback");
				let _ = tx.send(result);
			});
			rx.blocking_recv().context("detached run dropped its completion")?
		}
		Mode::Task => {
			let task = executor.run_cancellable(client, request, CancellationToken::new());
			let mut events = task.subscribe();
			simrun_worker::spawn(TaskClass::Detached, async move {
				while let Ok(event) = events.recv().await {
					report::print_progress(event);
				}
			});
			if let Some(secs) = args.cancel_after {
				let delay = Duration::try_from_secs_f64(secs).context("invalid --cancel-after")?;
				let canceller = task.clone();
				simrun_worker::spawn(TaskClass::Detached, async move {
					tokio::time::sleep(delay).await;
					tracing::info!(after_secs = secs, "simrun.cancel");
					canceller.cancel();
				});
			}
			simrun_worker::block_on(TaskClass::Blocking, async move { task.wait().await })?
		}
	};

	report::print_result(&result);
	result.map(|_| ()).map_err(Into::into)
}

fn chain(cli: &Cli, args: &ChainArgs) -> anyhow::Result<()> {
	let mesh_engine = PollingEngine::new(engine_config(cli, &OperationKind::Mesh)?)?;
	let run_engine = PollingEngine::new(engine_config(cli, &OperationKind::SimulationRun)?)?;
	let mesh_client = script::client(OperationKind::Mesh, &args.mesh_script, Some(""), Some("PT10M"))?;
	let run_client = script::client(OperationKind::SimulationRun, &args.run_script, Some(""), Some("PT1H"))?;

	let context = OperationContext::new(args.project.as_str());
	let mesh_request = OperationRequest::new("APIMesh", context.clone(), String::from("tet"));
	let derive = |mesh: &Completion| -> Result<OperationRequest<String>, String> {
		let mesh_id = mesh.artifact().ok_or("mesh operation reported no mesh")?;
		Ok(OperationRequest::new("Run 1", context.clone(), mesh_id.to_string()))
	};

	let outcome = simrun_worker::block_on(
		TaskClass::Blocking,
		run_chained(
			ChainStep::new(&mesh_engine, &mesh_client),
			&mesh_request,
			ChainStep::new(&run_engine, &run_client),
			derive,
			&report::print_progress,
			None,
		),
	)??;

	report::print_chain(&outcome);
	Ok(())
}

fn budget(cli: &Cli, args: &BudgetArgs) -> anyhow::Result<()> {
	let kind: OperationKind = args.kind.parse()?;
	let config = engine_config(cli, &kind)?;
	let interval = DurationInterval::from_iso8601(args.lower_bound.as_deref(), &args.upper_bound)?;
	let decision = BudgetDecision::from_estimate(&config, Estimate::Interval(interval));
	println!(
		"{kind}: estimate up to {}s, timeout budget {}s (floor {}s, x{})",
		interval.max.as_secs(),
		decision.budget.as_duration().as_secs(),
		config.timeout_floor.as_secs(),
		config.timeout_multiplier
	);
	Ok(())
}
