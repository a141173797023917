use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use anyhow::Result;

use crate::command::run_captured;
use crate::VerifiedEnvironment;

/// Applies a dependency manifest inside the isolated environment.
pub trait DependencyInstaller {
    fn install_from_manifest(
        &mut self,
        env: &VerifiedEnvironment,
        manifest: &Path,
    ) -> Result<InstallOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { summary: Option<String> },
    AlreadySatisfied,
}

impl InstallOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::AlreadySatisfied)
    }
}

/// `python -m pip install --upgrade -r <manifest>` with the environment's
/// interpreter; `VIRTUAL_ENV` and `PATH` point at the isolated environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipInstaller;

impl DependencyInstaller for PipInstaller {
    fn install_from_manifest(
        &mut self,
        env: &VerifiedEnvironment,
        manifest: &Path,
    ) -> Result<InstallOutcome> {
        if !manifest.is_file() {
            anyhow::bail!("dependency manifest not found: {}", manifest.display());
        }

        let mut command = Command::new(&env.interpreter);
        command
            .arg("-m")
            .arg("pip")
            .arg("install")
            .arg("--upgrade")
            .arg("--disable-pip-version-check")
            .arg("-r")
            .arg(manifest)
            .env("VIRTUAL_ENV", &env.env_dir)
            .env("PATH", isolated_search_path(env))
            .env_remove("PYTHONHOME");
        if let Some(parent) = manifest.parent() {
            command.current_dir(parent);
        }

        let output = run_captured(
            &mut command,
            &format!("dependency install from {} failed", manifest.display()),
        )?;
        Ok(classify_pip_output(&output.stdout))
    }
}

fn isolated_search_path(env: &VerifiedEnvironment) -> OsString {
    let mut dirs = Vec::new();
    if let Some(bin) = env.interpreter.parent() {
        dirs.push(bin.to_path_buf());
    }
    if let Some(current) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(dirs).unwrap_or_default()
}

/// Reduces pip's report to installed-or-already-satisfied.
pub fn classify_pip_output(stdout: &str) -> InstallOutcome {
    let summary = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Successfully installed"))
        .map(ToOwned::to_owned);

    match summary {
        Some(summary) => InstallOutcome::Installed {
            summary: Some(summary),
        },
        None if stdout.lines().any(|line| {
            let line = line.trim();
            line.starts_with("Collecting") || line.starts_with("Installing collected packages")
        }) =>
        {
            InstallOutcome::Installed { summary: None }
        }
        None => InstallOutcome::AlreadySatisfied,
    }
}
