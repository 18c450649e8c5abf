use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "simrun")]
#[command(about = "Drive remote long-running operations through their lifecycle")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Engine policy file (TOML); defaults to the profile of the operation kind
	#[arg(long, short = 'c', global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Override the poll interval, in milliseconds
	#[arg(long, global = true, value_name = "MS")]
	pub interval_ms: Option<u64>,

	/// Verbose logging
	#[arg(long, short = 'v', global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run one operation against a scripted service
	Run(RunArgs),
	/// Run a mesh, then a simulation run on the resulting mesh
	Chain(ChainArgs),
	/// Print the timeout budget an estimate would produce
	Budget(BudgetArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
	/// Operation kind (mesh, simulation-run, geometry-import, ...)
	#[arg(long, short = 'k', default_value = "mesh")]
	pub kind: String,

	/// Display name of the created object
	#[arg(long, short = 'n', default_value = "APIMesh")]
	pub name: String,

	#[arg(long, default_value = "project")]
	pub project: String,

	/// How to wait for the result
	#[arg(long, short = 'm', value_enum, default_value_t = Mode::Blocking)]
	pub mode: Mode,

	/// Status refreshes to replay, comma separated. Entries are a status
	/// (`RUNNING`), a status with progress (`RUNNING:0.4`), `-` for an
	/// empty answer, or `!CODE` for an error response
	#[arg(long, short = 's', default_value = "QUEUED,RUNNING:0.5,FINISHED")]
	pub script: String,

	/// Setup check entries, comma separated (`warn:message` or `error:message`)
	#[arg(long)]
	pub check: Option<String>,

	/// Estimated upper bound as an ISO-8601 duration; `!CODE` rejects the
	/// estimate with that status code
	#[arg(long)]
	pub estimate: Option<String>,

	/// Cancel after this many seconds (task mode only)
	#[arg(long, value_name = "SECS")]
	pub cancel_after: Option<f64>,
}

#[derive(Args, Debug)]
pub struct ChainArgs {
	#[arg(long, default_value = "project")]
	pub project: String,

	/// Refreshes replayed for the mesh operation
	#[arg(long, default_value = "RUNNING:0.5,FINISHED")]
	pub mesh_script: String,

	/// Refreshes replayed for the simulation run
	#[arg(long, default_value = "QUEUED,RUNNING:0.3,RUNNING:0.9,FINISHED")]
	pub run_script: String,
}

#[derive(Args, Debug)]
pub struct BudgetArgs {
	/// Estimated upper bound, ISO-8601 (`PT1H30M`)
	pub upper_bound: String,

	/// Estimated lower bound, ISO-8601
	#[arg(long)]
	pub lower_bound: Option<String>,

	/// Operation kind whose policy applies
	#[arg(long, short = 'k', default_value = "mesh")]
	pub kind: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
	/// Wait on the calling thread
	Blocking,
	/// Submit and receive the result through a completion callback
	Detached,
	/// Cancellable task with progress
	Task,
}
