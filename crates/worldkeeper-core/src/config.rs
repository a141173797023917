use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ResetStrategy;

pub const DEFAULT_CONFIG_FILE: &str = "worldkeeper.toml";

/// Launcher argument vectors for each administrative verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminVerbs {
    pub stop: Vec<String>,
    pub start: Vec<String>,
    pub restart: Vec<String>,
    /// Prefix for admin scripts; the script source is appended as the last argument.
    pub script: Vec<String>,
}

impl Default for AdminVerbs {
    fn default() -> Self {
        Self {
            stop: vec!["stop".to_string()],
            start: vec!["start".to_string()],
            restart: vec!["reboot".to_string()],
            script: vec!["shell".to_string(), "-c".to_string()],
        }
    }
}

/// Everything a single update or reset run needs, resolved once.
///
/// Relative paths in the config file resolve against the service working
/// directory, which itself resolves against the file's directory. One value
/// is owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    pub working_dir: PathBuf,
    pub env_dir: PathBuf,
    pub interpreter: PathBuf,
    pub launcher: String,
    pub manifest: PathBuf,
    pub settings_path: PathBuf,
    pub database: PathBuf,
    pub backup: PathBuf,
    pub wipe_timestamp: PathBuf,
    pub canonical_location: String,
    pub settle: Duration,
    pub strategy: ResetStrategy,
    pub init_script: Option<String>,
    pub admin: AdminVerbs,
    pub log_path: PathBuf,
    pub version_file: PathBuf,
    pub changelog: PathBuf,
    /// Directories searched for the launcher after the isolated environment.
    pub search_path: Option<OsString>,
}

impl RunConfiguration {
    /// Reads a config file and captures the current `PATH` for launcher lookup.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let config = Self::from_toml_str(&content, &base_dir)
            .with_context(|| format!("failed parsing config: {}", path.display()))?;
        Ok(config.with_search_path(std::env::var_os("PATH")))
    }

    pub fn from_toml_str(input: &str, base_dir: &Path) -> Result<Self> {
        let file: ConfigFile = toml::from_str(input).context("failed to parse worldkeeper config")?;
        file.resolve(base_dir)
    }

    /// Configuration with every default, rooted at `working_dir`.
    pub fn for_working_dir(working_dir: impl Into<PathBuf>) -> Result<Self> {
        ConfigFile::default().resolve(&working_dir.into())
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn with_strategy(mut self, strategy: ResetStrategy) -> Result<Self> {
        self.strategy = strategy;
        validate_strategy(&self.strategy)?;
        Ok(self)
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Directory holding the isolated environment's executables.
    pub fn env_bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.env_dir.join("Scripts")
        } else {
            self.env_dir.join("bin")
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    service: ServiceSection,
    state: StateSection,
    reset: ResetSection,
    admin: AdminVerbs,
    log: LogSection,
    release: ReleaseSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServiceSection {
    working_dir: PathBuf,
    env_dir: PathBuf,
    interpreter: PathBuf,
    launcher: String,
    manifest: PathBuf,
    settings: PathBuf,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            env_dir: PathBuf::from(".venv"),
            interpreter: PathBuf::from(if cfg!(windows) {
                "Scripts/python.exe"
            } else {
                "bin/python"
            }),
            launcher: "evennia".to_string(),
            manifest: PathBuf::from("requirements.txt"),
            settings: PathBuf::from("server/conf/settings.py"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StateSection {
    database: PathBuf,
    backup: Option<PathBuf>,
    wipe_timestamp: PathBuf,
    canonical_location: String,
    settle_secs: u64,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            database: PathBuf::from("server/evennia.db3"),
            backup: None,
            wipe_timestamp: PathBuf::from("server/conf/last_wipe_timestamp"),
            canonical_location: "#2".to_string(),
            settle_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StrategyName {
    #[default]
    Wipe,
    Restore,
    Cleanup,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ResetSection {
    strategy: StrategyName,
    template: Option<PathBuf>,
    script: Option<String>,
    init_script: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogSection {
    path: PathBuf,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("server/logs/worldkeeper.log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ReleaseSection {
    version_file: PathBuf,
    changelog: PathBuf,
}

impl Default for ReleaseSection {
    fn default() -> Self {
        Self {
            version_file: PathBuf::from("VERSION"),
            changelog: PathBuf::from("CHANGELOG.md"),
        }
    }
}

impl ConfigFile {
    fn resolve(self, base_dir: &Path) -> Result<RunConfiguration> {
        let working_dir = resolve_path(base_dir, &self.service.working_dir);
        let env_dir = resolve_path(&working_dir, &self.service.env_dir);
        let interpreter = resolve_path(&env_dir, &self.service.interpreter);
        let database = resolve_path(&working_dir, &self.state.database);
        let backup = match &self.state.backup {
            Some(backup) => resolve_path(&working_dir, backup),
            None => default_backup_path(&database),
        };

        let strategy = match self.reset.strategy {
            StrategyName::Wipe => ResetStrategy::Wipe,
            StrategyName::Restore => {
                let template = self
                    .reset
                    .template
                    .as_deref()
                    .ok_or_else(|| anyhow!("reset.template is required for strategy 'restore'"))?;
                ResetStrategy::Restore {
                    template: resolve_path(&working_dir, template),
                }
            }
            StrategyName::Cleanup => ResetStrategy::Cleanup {
                script: self
                    .reset
                    .script
                    .clone()
                    .ok_or_else(|| anyhow!("reset.script is required for strategy 'cleanup'"))?,
            },
        };
        validate_strategy(&strategy)?;

        validate_canonical_location(&self.state.canonical_location)?;
        if self.service.launcher.trim().is_empty() {
            anyhow::bail!("service.launcher must not be empty");
        }
        for (key, verb) in [
            ("admin.stop", &self.admin.stop),
            ("admin.start", &self.admin.start),
            ("admin.restart", &self.admin.restart),
            ("admin.script", &self.admin.script),
        ] {
            if verb.is_empty() {
                anyhow::bail!("{key} must name at least one launcher argument");
            }
        }
        if backup == database {
            anyhow::bail!(
                "state.backup must differ from state.database: {}",
                database.display()
            );
        }
        if let ResetStrategy::Restore { template } = &strategy {
            if *template == database {
                anyhow::bail!(
                    "reset.template must differ from state.database: {}",
                    database.display()
                );
            }
        }

        let init_script = self
            .reset
            .init_script
            .filter(|script| !script.trim().is_empty());

        Ok(RunConfiguration {
            env_dir,
            interpreter,
            launcher: self.service.launcher,
            manifest: resolve_path(&working_dir, &self.service.manifest),
            settings_path: resolve_path(&working_dir, &self.service.settings),
            database,
            backup,
            wipe_timestamp: resolve_path(&working_dir, &self.state.wipe_timestamp),
            canonical_location: self.state.canonical_location,
            settle: Duration::from_secs(self.state.settle_secs),
            strategy,
            init_script,
            admin: self.admin,
            log_path: resolve_path(&working_dir, &self.log.path),
            version_file: resolve_path(&working_dir, &self.release.version_file),
            changelog: resolve_path(&working_dir, &self.release.changelog),
            search_path: None,
            working_dir,
        })
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else if path == Path::new(".") {
        base.to_path_buf()
    } else {
        base.join(path)
    }
}

fn default_backup_path(database: &Path) -> PathBuf {
    let mut raw = database.as_os_str().to_os_string();
    raw.push(".bak");
    PathBuf::from(raw)
}

fn validate_strategy(strategy: &ResetStrategy) -> Result<()> {
    if let ResetStrategy::Cleanup { script } = strategy {
        if script.trim().is_empty() {
            anyhow::bail!("reset.script must not be empty for strategy 'cleanup'");
        }
    }
    Ok(())
}

fn validate_canonical_location(location: &str) -> Result<()> {
    if location.trim().is_empty() {
        anyhow::bail!("state.canonical_location must not be empty");
    }
    if location
        .chars()
        .any(|ch| ch == '"' || ch == '\\' || ch.is_control())
    {
        anyhow::bail!("state.canonical_location contains invalid character(s): {location:?}");
    }
    Ok(())
}
