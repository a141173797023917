use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use worldkeeper_core::{EnvironmentError, RunConfiguration};

/// Prerequisites confirmed by [`verify_environment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEnvironment {
    pub env_dir: PathBuf,
    pub interpreter: PathBuf,
    pub launcher: PathBuf,
}

/// Confirms runtime prerequisites before any service-affecting step.
pub trait EnvironmentVerifier {
    fn verify(&self, config: &RunConfiguration) -> Result<VerifiedEnvironment, EnvironmentError>;
}

/// Checks the real filesystem via [`verify_environment`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemVerifier;

impl EnvironmentVerifier for FilesystemVerifier {
    fn verify(&self, config: &RunConfiguration) -> Result<VerifiedEnvironment, EnvironmentError> {
        verify_environment(config)
    }
}

/// Read-only prerequisite checks, in order: isolated environment directory,
/// interpreter inside it, then the service launcher (isolated environment
/// first, search path second). Stops at the first missing prerequisite.
pub fn verify_environment(
    config: &RunConfiguration,
) -> Result<VerifiedEnvironment, EnvironmentError> {
    if !config.env_dir.is_dir() {
        return Err(EnvironmentError::MissingDependencyEnvironment {
            path: config.env_dir.clone(),
        });
    }

    if !is_executable(&config.interpreter) {
        return Err(EnvironmentError::MissingInterpreter {
            path: config.interpreter.clone(),
        });
    }

    let env_bin = config.env_bin_dir();
    let launcher = resolve_launcher(&env_bin, &config.launcher, config.search_path.as_deref())
        .ok_or_else(|| EnvironmentError::MissingServiceLauncher {
            launcher: config.launcher.clone(),
            env_bin: env_bin.clone(),
        })?;

    Ok(VerifiedEnvironment {
        env_dir: config.env_dir.clone(),
        interpreter: config.interpreter.clone(),
        launcher,
    })
}

fn resolve_launcher(env_bin: &Path, launcher: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let as_path = Path::new(launcher);
    if as_path.components().count() > 1 {
        return is_executable(as_path).then(|| as_path.to_path_buf());
    }

    if let Some(found) = executable_in_dir(env_bin, launcher) {
        return Some(found);
    }

    let search_path = search_path?;
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| executable_in_dir(&dir, launcher))
}

fn executable_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if is_executable(&candidate) {
        return Some(candidate);
    }
    if cfg!(windows) {
        let candidate = dir.join(format!("{name}.exe"));
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

pub(crate) fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
