use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::ResetState;

/// A runtime prerequisite that is missing. Each variant names exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    #[error("isolated dependency environment not found: {}", .path.display())]
    MissingDependencyEnvironment { path: PathBuf },
    #[error("interpreter missing or not executable: {}", .path.display())]
    MissingInterpreter { path: PathBuf },
    #[error(
        "service launcher '{launcher}' not found in {} or on the search path",
        .env_bin.display()
    )]
    MissingServiceLauncher { launcher: String, env_bin: PathBuf },
}

impl EnvironmentError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingDependencyEnvironment { .. } => "missing-dependency-environment",
            Self::MissingInterpreter { .. } => "missing-interpreter",
            Self::MissingServiceLauncher { .. } => "missing-service-launcher",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    Sync,
    Verify,
    Install,
    Restart,
}

impl UpdateStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Verify => "verify",
            Self::Install => "install",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("sync-failed: {0:#}")]
    SyncFailed(anyhow::Error),
    /// Inlined into the message and not exposed as a source.
    #[error("environment-invalid: {0}")]
    EnvironmentInvalid(EnvironmentError),
    #[error("dependency-install-failed: {0:#}")]
    DependencyInstallFailed(anyhow::Error),
    #[error("restart-failed: {0:#}")]
    RestartFailed(anyhow::Error),
}

impl From<EnvironmentError> for UpdateError {
    fn from(err: EnvironmentError) -> Self {
        Self::EnvironmentInvalid(err)
    }
}

impl UpdateError {
    pub fn step(&self) -> UpdateStep {
        match self {
            Self::SyncFailed(_) => UpdateStep::Sync,
            Self::EnvironmentInvalid(_) => UpdateStep::Verify,
            Self::DependencyInstallFailed(_) => UpdateStep::Install,
            Self::RestartFailed(_) => UpdateStep::Restart,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::SyncFailed(_) => "sync-failed",
            Self::EnvironmentInvalid(_) => "environment-invalid",
            Self::DependencyInstallFailed(_) => "dependency-install-failed",
            Self::RestartFailed(_) => "restart-failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetErrorKind {
    /// stop/start signal rejected or the admin channel was unreachable.
    ProcessControl,
    /// file copy, delete, replace or settings rewrite failed.
    StateMutation,
}

impl ResetErrorKind {
    pub fn reason_code(self) -> &'static str {
        match self {
            Self::ProcessControl => "process-control-failed",
            Self::StateMutation => "state-mutation-failed",
        }
    }
}

/// A hard reset failure. The system is left in `last_completed`.
#[derive(Debug, Error)]
#[error(
    "{}: {} step failed (last completed state: {}): {:#}",
    .kind.reason_code(),
    .step,
    last_completed_label(.last_completed),
    .detail
)]
pub struct ResetError {
    pub kind: ResetErrorKind,
    pub step: ResetState,
    pub last_completed: Option<ResetState>,
    pub detail: anyhow::Error,
}

impl ResetError {
    pub fn new(kind: ResetErrorKind, step: ResetState, detail: anyhow::Error) -> Self {
        Self {
            kind,
            step,
            last_completed: step.previous(),
            detail,
        }
    }
}

fn last_completed_label(state: &Option<ResetState>) -> &'static str {
    state.map(ResetState::as_str).unwrap_or("none")
}

/// A soft failure after persistent state is already valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Degradation {
    #[error("provenance-failed: {0}")]
    Provenance(String),
    #[error("initialization-failed: {0}")]
    Initialization(String),
}
