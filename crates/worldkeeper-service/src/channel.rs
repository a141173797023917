use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use worldkeeper_core::{AdminVerbs, RunConfiguration};

use crate::command::run_captured;
use crate::VerifiedEnvironment;

/// Privileged control surface of the running service.
///
/// Success means the request was accepted, not that the service reached a
/// ready state.
pub trait AdminChannel {
    fn stop(&mut self) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn restart(&mut self) -> Result<()>;
    fn run_admin_script(&mut self, source: &str) -> Result<String>;
}

/// Opens an admin channel once the launcher has been located.
pub trait ChannelConnector {
    fn connect(
        &mut self,
        env: &VerifiedEnvironment,
        config: &RunConfiguration,
    ) -> Box<dyn AdminChannel>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LauncherConnector;

impl ChannelConnector for LauncherConnector {
    fn connect(
        &mut self,
        env: &VerifiedEnvironment,
        config: &RunConfiguration,
    ) -> Box<dyn AdminChannel> {
        Box::new(LauncherChannel::new(env, config))
    }
}

/// Drives the service through its launcher binary.
#[derive(Debug, Clone)]
pub struct LauncherChannel {
    launcher: PathBuf,
    working_dir: PathBuf,
    env_dir: PathBuf,
    verbs: AdminVerbs,
}

impl LauncherChannel {
    pub fn new(env: &VerifiedEnvironment, config: &RunConfiguration) -> Self {
        Self {
            launcher: env.launcher.clone(),
            working_dir: config.working_dir.clone(),
            env_dir: env.env_dir.clone(),
            verbs: config.admin.clone(),
        }
    }

    fn launcher_command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.launcher);
        command
            .args(args)
            .current_dir(&self.working_dir)
            .env("VIRTUAL_ENV", &self.env_dir);
        command
    }

    fn signal(&self, verb: &str, args: &[String]) -> Result<()> {
        run_captured(
            &mut self.launcher_command(args),
            &format!("service {verb} request rejected"),
        )?;
        Ok(())
    }
}

impl AdminChannel for LauncherChannel {
    fn stop(&mut self) -> Result<()> {
        self.signal("stop", &self.verbs.stop)
    }

    fn start(&mut self) -> Result<()> {
        self.signal("start", &self.verbs.start)
    }

    fn restart(&mut self) -> Result<()> {
        self.signal("restart", &self.verbs.restart)
    }

    fn run_admin_script(&mut self, source: &str) -> Result<String> {
        if self.verbs.script.is_empty() {
            anyhow::bail!("admin.script is not configured; cannot run admin scripts");
        }
        let mut command = self.launcher_command(&self.verbs.script);
        command.arg(source);
        let output = run_captured(&mut command, "admin script failed")
            .context("admin channel rejected script")?;
        Ok(output.stdout.trim_end().to_string())
    }
}
