use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::sha256_file;

pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Copies `source` to a staging sibling of `destination`, verifies the copy
/// byte-for-byte by digest, then renames it over `destination`.
///
/// `destination` is either untouched or fully replaced. Returns the digest.
pub fn copy_then_replace(source: &Path, destination: &Path) -> Result<String> {
    let staging = staging_path(destination);
    let result = (|| -> Result<String> {
        ensure_parent_dir(destination)?;
        fs::copy(source, &staging).with_context(|| {
            format!(
                "failed copying {} to {}",
                source.display(),
                staging.display()
            )
        })?;
        let expected = sha256_file(source)?;
        let actual = sha256_file(&staging)?;
        if expected != actual {
            anyhow::bail!(
                "copy of {} is not byte-identical (expected sha256 {expected}, got {actual})",
                source.display()
            );
        }
        sync_file(&staging)?;
        fs::rename(&staging, destination).with_context(|| {
            format!(
                "failed replacing {} with {}",
                destination.display(),
                staging.display()
            )
        })?;
        Ok(actual)
    })();

    if result.is_err() {
        let _ = remove_file_if_exists(&staging);
    }
    result
}

/// Writes `content` to a staging sibling, then renames it over `destination`.
pub fn write_then_replace(destination: &Path, content: &[u8]) -> Result<()> {
    let staging = staging_path(destination);
    let result = (|| -> Result<()> {
        ensure_parent_dir(destination)?;
        let mut file = fs::File::create(&staging)
            .with_context(|| format!("failed to create {}", staging.display()))?;
        file.write_all(content)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync {}", staging.display()))?;
        fs::rename(&staging, destination).with_context(|| {
            format!(
                "failed replacing {} with {}",
                destination.display(),
                staging.display()
            )
        })
    })();

    if result.is_err() {
        let _ = remove_file_if_exists(&staging);
    }
    result
}

pub(crate) fn staging_path(destination: &Path) -> PathBuf {
    let mut raw = destination.as_os_str().to_os_string();
    raw.push(format!(".tmp-{}-{}", std::process::id(), unique_suffix()));
    PathBuf::from(raw)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn sync_file(path: &Path) -> Result<()> {
    fs::OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.sync_all())
        .with_context(|| format!("failed to sync {}", path.display()))
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}
