use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use worldkeeper_core::{format_elapsed_since, RunConfiguration, DEFAULT_CONFIG_FILE};
use worldkeeper_flows::{LogSink, ResetOptions, ResetOrchestrator, UpdateOrchestrator};
use worldkeeper_service::{
    EnvironmentVerifier, FilesystemVerifier, GitSync, LauncherChannel, LauncherConnector,
    PipInstaller,
};
use worldkeeper_state::{current_unix_millis, read_wipe_timestamp};

use crate::completion::{resolve_completion_shell, write_completions_script};
use crate::release::run_release;
use crate::remote::trigger_remote_update;
use crate::render::{format_reset_summary_lines, format_update_summary_line, TerminalRenderer};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::current();

    match cli.command {
        Commands::Update => {
            let config = load_run_configuration(cli.config.as_deref())?;
            let mut log = open_run_log(&config, renderer)?;
            renderer.print_section("update");

            let verifier = FilesystemVerifier;
            let mut sync = GitSync;
            let mut installer = PipInstaller;
            let mut connector = LauncherConnector;
            let report = UpdateOrchestrator::new(
                &config,
                &verifier,
                &mut sync,
                &mut installer,
                &mut connector,
            )
            .run(&mut log)?;
            renderer.print_status("ok", &format_update_summary_line(&report));
        }
        Commands::Reset {
            skip_backup,
            no_init,
        } => {
            let config = load_run_configuration(cli.config.as_deref())?;
            let mut log = open_run_log(&config, renderer)?;
            renderer.print_section("reset");

            let env = match FilesystemVerifier.verify(&config) {
                Ok(env) => env,
                Err(err) => {
                    log.error(format!(
                        "reset: aborted before stop: {err} (reason={})",
                        err.reason_code()
                    ));
                    return Err(err.into());
                }
            };
            let mut channel = LauncherChannel::new(&env, &config);
            let options = ResetOptions {
                skip_backup,
                run_init: !no_init,
            };
            let report = ResetOrchestrator::new(&config, &mut channel, options)
                .with_pause(|duration| renderer.settle(duration))
                .run(&mut log)?;
            for line in format_reset_summary_lines(&report, renderer.style()) {
                println!("{line}");
            }
        }
        Commands::Verify => {
            let config = load_run_configuration(cli.config.as_deref())?;
            let env = FilesystemVerifier.verify(&config)?;
            renderer.print_status(
                "ok",
                &format!("environment: {}", env.env_dir.display()),
            );
            renderer.print_status(
                "ok",
                &format!("interpreter: {}", env.interpreter.display()),
            );
            renderer.print_status("ok", &format!("launcher: {}", env.launcher.display()));
        }
        Commands::SinceWipe => {
            let config = load_run_configuration(cli.config.as_deref())?;
            let since = describe_since_wipe(&config.wipe_timestamp, current_unix_millis()?);
            if let Some(warning) = &since.warning {
                renderer.print_status("warn", warning);
            }
            println!("{}", since.line);
        }
        Commands::Release {
            selector,
            notes,
            no_publish,
        } => {
            let config = load_run_configuration(cli.config.as_deref())?;
            let mut log = open_run_log(&config, renderer)?;
            let outcome = run_release(
                &config,
                selector.into(),
                &notes,
                !no_publish,
                Local::now().date_naive(),
                &mut log,
            )?;
            let verb = if outcome.published {
                "published"
            } else {
                "prepared"
            };
            renderer.print_status(
                "ok",
                &format!(
                    "release {verb}: {} -> {} ({})",
                    outcome.previous, outcome.next, outcome.tag
                ),
            );
        }
        Commands::RemoteUpdate { endpoint, token } => {
            let status = trigger_remote_update(&endpoint, &token)?;
            renderer.print_status("ok", &format!("remote update: {status}"));
        }
        Commands::Completions { shell } => {
            let shell = resolve_completion_shell(
                shell,
                std::env::var("SHELL").ok().as_deref(),
                cfg!(windows),
            );
            let mut stdout = io::stdout().lock();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

/// An explicit path must exist; otherwise `./worldkeeper.toml` is used when
/// present, and the built-in defaults rooted at `.` when not.
pub(crate) fn load_run_configuration(path: Option<&Path>) -> Result<RunConfiguration> {
    if let Some(path) = path {
        return RunConfiguration::load(path);
    }
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        return RunConfiguration::load(default_path);
    }
    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
    Ok(RunConfiguration::for_working_dir(".")
        .context("failed to resolve default configuration")?
        .with_search_path(std::env::var_os("PATH")))
}

fn open_run_log(config: &RunConfiguration, renderer: TerminalRenderer) -> Result<LogSink> {
    let sink = LogSink::open(&config.log_path)?;
    Ok(sink.with_observer(move |level, message| renderer.print_record(level, message)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SinceWipe {
    pub(crate) line: String,
    pub(crate) warning: Option<String>,
}

/// An unreadable record is reported as never wiped, with a warning.
pub(crate) fn describe_since_wipe(record: &Path, now_ms: u64) -> SinceWipe {
    match read_wipe_timestamp(record) {
        Ok(previous) => SinceWipe {
            line: format_since_wipe(previous, now_ms),
            warning: None,
        },
        Err(err) => {
            tracing::warn!(record = %record.display(), "wipe record unreadable: {err:#}");
            SinceWipe {
                line: format_since_wipe(None, now_ms),
                warning: Some(format!("wipe record unreadable, treating as never wiped: {err:#}")),
            }
        }
    }
}

pub(crate) fn format_since_wipe(previous_ms: Option<u64>, now_ms: u64) -> String {
    match previous_ms {
        Some(previous) => format!(
            "last wipe: {} ago",
            format_elapsed_since(Some(previous), now_ms)
        ),
        None => "last wipe: never".to_string(),
    }
}
