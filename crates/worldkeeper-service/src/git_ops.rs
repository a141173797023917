use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use crate::command::run_captured;

/// Pulls the latest source into a working directory.
pub trait SourceSync {
    fn sync(&mut self, working_dir: &Path) -> Result<SyncOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated { from: String, to: String },
    UpToDate { head: String },
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::UpToDate { .. })
    }
}

/// Fast-forward-only `git pull`; conflicts and network errors fail the sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitSync;

impl SourceSync for GitSync {
    fn sync(&mut self, working_dir: &Path) -> Result<SyncOutcome> {
        let before = git_head(working_dir)?;
        run_git_command(working_dir, &["pull", "--ff-only"])?;
        let after = git_head(working_dir)?;

        if before == after {
            Ok(SyncOutcome::UpToDate { head: after })
        } else {
            Ok(SyncOutcome::Updated {
                from: before,
                to: after,
            })
        }
    }
}

pub(crate) fn base_git_command() -> Command {
    let mut command = Command::new("git");
    command
        .arg("-c")
        .arg("core.autocrlf=false")
        .arg("-c")
        .arg("core.eol=lf");
    if cfg!(windows) {
        command.arg("-c").arg("core.longpaths=true");
    }
    command
}

pub(crate) fn run_git_command(repo_root: &Path, args: &[&str]) -> Result<String> {
    let output = run_captured(
        base_git_command().args(args).current_dir(repo_root),
        &format!("git {} failed in {}", args.join(" "), repo_root.display()),
    )?;
    Ok(output.stdout)
}

/// Short (12 hex) commit id of `HEAD`.
pub fn git_head(repo_root: &Path) -> Result<String> {
    let stdout = run_git_command(repo_root, &["rev-parse", "HEAD"])?;
    short_commit_id(&stdout)
        .with_context(|| format!("git rev-parse returned invalid HEAD in {}", repo_root.display()))
}

pub(crate) fn short_commit_id(full_sha: &str) -> Result<String> {
    let normalized = full_sha.trim();
    if normalized.len() < 12 {
        anyhow::bail!("git HEAD sha too short: '{normalized}'");
    }
    if !normalized.chars().all(|ch| ch.is_ascii_hexdigit()) {
        anyhow::bail!("git HEAD sha contains non-hex characters: '{normalized}'");
    }
    Ok(normalized.chars().take(12).collect())
}

pub fn git_commit_paths(repo_root: &Path, paths: &[&Path], message: &str) -> Result<()> {
    let mut add = base_git_command();
    add.arg("add").arg("--").args(paths).current_dir(repo_root);
    run_captured(&mut add, "git add failed")?;
    run_git_command(repo_root, &["commit", "-m", message])?;
    Ok(())
}

pub fn git_create_tag(repo_root: &Path, tag: &str, message: &str) -> Result<()> {
    run_git_command(repo_root, &["tag", "-a", tag, "-m", message])?;
    Ok(())
}

pub fn git_push_with_tags(repo_root: &Path) -> Result<()> {
    run_git_command(repo_root, &["push", "--follow-tags"])?;
    Ok(())
}
