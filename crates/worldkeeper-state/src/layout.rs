use std::path::{Path, PathBuf};

use worldkeeper_core::RunConfiguration;

/// Filesystem surface a reset touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    database: PathBuf,
    backup: PathBuf,
    settings: PathBuf,
    wipe_timestamp: PathBuf,
}

impl StateLayout {
    pub fn new(
        database: impl Into<PathBuf>,
        backup: impl Into<PathBuf>,
        settings: impl Into<PathBuf>,
        wipe_timestamp: impl Into<PathBuf>,
    ) -> Self {
        Self {
            database: database.into(),
            backup: backup.into(),
            settings: settings.into(),
            wipe_timestamp: wipe_timestamp.into(),
        }
    }

    pub fn from_config(config: &RunConfiguration) -> Self {
        Self::new(
            &config.database,
            &config.backup,
            &config.settings_path,
            &config.wipe_timestamp,
        )
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    pub fn settings(&self) -> &Path {
        &self.settings
    }

    pub fn wipe_timestamp(&self) -> &Path {
        &self.wipe_timestamp
    }
}
