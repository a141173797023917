use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use worldkeeper_core::BumpSelector;

mod completion;
mod dispatch;
mod release;
mod remote;
mod render;
mod telemetry;

use completion::CliCompletionShell;

#[derive(Parser, Debug)]
#[command(name = "worldkeeper", version)]
#[command(
    about = "Keeps a persistent-world service updated and resets its world state",
    long_about = None
)]
struct Cli {
    /// Path to worldkeeper.toml; defaults to ./worldkeeper.toml when present.
    #[arg(long, global = true, env = "WORLDKEEPER_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull source, verify the environment, install dependencies and restart.
    Update,
    /// Stop the service, back up and reset world state, then start it again.
    Reset {
        /// Destroy world state without taking a backup first.
        #[arg(long)]
        skip_backup: bool,
        /// Skip the configured one-time initialization routine for this run.
        #[arg(long)]
        no_init: bool,
    },
    /// Check the isolated environment, interpreter and service launcher.
    Verify,
    /// Print the time elapsed since the last recorded wipe.
    SinceWipe,
    /// Bump the version file, prepend a changelog entry and publish a tag.
    Release {
        #[arg(value_enum)]
        selector: CliBumpSelector,
        #[arg(long = "note", required = true)]
        notes: Vec<String>,
        #[arg(long)]
        no_publish: bool,
    },
    /// Ask a remote host to run an update.
    RemoteUpdate {
        #[arg(long)]
        endpoint: String,
        #[arg(long, env = "WORLDKEEPER_SYNC_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Option<CliCompletionShell>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliBumpSelector {
    Major,
    Minor,
    Patch,
}

impl From<CliBumpSelector> for BumpSelector {
    fn from(value: CliBumpSelector) -> Self {
        match value {
            CliBumpSelector::Major => BumpSelector::Major,
            CliBumpSelector::Minor => BumpSelector::Minor,
            CliBumpSelector::Patch => BumpSelector::Patch,
        }
    }
}

fn main() -> ExitCode {
    telemetry::init_tracing();
    let cli = Cli::parse();
    match dispatch::run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
