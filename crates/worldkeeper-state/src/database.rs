use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use worldkeeper_core::ResetStrategy;

use crate::{copy_then_replace, remove_file_if_exists, StateLayout};

/// A verified byte-for-byte copy of the database taken before mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// What the Mutated state did to the database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseChange {
    Deleted,
    AlreadyAbsent,
    Restored { template: PathBuf, sha256: String },
    /// Left for the admin-channel cleanup routine.
    Untouched,
}

/// Copies the live database over the backup path, superseding any prior
/// snapshot. Returns `None` when there is no live database to preserve.
pub fn snapshot_database(layout: &StateLayout) -> Result<Option<SnapshotRecord>> {
    let database = layout.database();
    let metadata = match fs::metadata(database) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to inspect database: {}", database.display()));
        }
    };
    if !metadata.is_file() {
        anyhow::bail!("database path is not a file: {}", database.display());
    }

    let sha256 = copy_then_replace(database, layout.backup()).with_context(|| {
        format!(
            "failed backing up {} to {}",
            database.display(),
            layout.backup().display()
        )
    })?;
    Ok(Some(SnapshotRecord {
        path: layout.backup().to_path_buf(),
        sha256,
        bytes: metadata.len(),
    }))
}

/// File-level half of the Mutated state.
pub fn apply_database_strategy(
    layout: &StateLayout,
    strategy: &ResetStrategy,
) -> Result<DatabaseChange> {
    let database = layout.database();
    match strategy {
        ResetStrategy::Wipe => {
            let removed = remove_file_if_exists(database)
                .with_context(|| format!("failed to delete database: {}", database.display()))?;
            Ok(if removed {
                DatabaseChange::Deleted
            } else {
                DatabaseChange::AlreadyAbsent
            })
        }
        ResetStrategy::Restore { template } => restore_from_template(database, template),
        ResetStrategy::Cleanup { .. } => Ok(DatabaseChange::Untouched),
    }
}

fn restore_from_template(database: &Path, template: &Path) -> Result<DatabaseChange> {
    if !template.is_file() {
        anyhow::bail!("template database not found: {}", template.display());
    }
    let sha256 = copy_then_replace(template, database).with_context(|| {
        format!(
            "failed restoring {} from template {}",
            database.display(),
            template.display()
        )
    })?;
    Ok(DatabaseChange::Restored {
        template: template.to_path_buf(),
        sha256,
    })
}
