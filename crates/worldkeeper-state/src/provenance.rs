use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

use crate::remove_file_if_exists;

pub fn current_unix_millis() -> Result<u64> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_millis();
    u64::try_from(millis).context("unix millis overflow u64")
}

/// Reads the most recent wipe time (unix ms). Absent or empty means never wiped.
pub fn read_wipe_timestamp(path: &Path) -> Result<Option<u64>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read wipe timestamp: {}", path.display()));
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<u64>()
        .with_context(|| format!("wipe timestamp is not an integer: {}", path.display()))?;
    if value == 0 {
        return Err(anyhow!("wipe timestamp must be positive: {}", path.display()));
    }
    Ok(Some(value))
}

/// Replaces any prior record with `timestamp_ms`; never appends.
pub fn record_wipe_timestamp(path: &Path, timestamp_ms: u64) -> Result<()> {
    remove_file_if_exists(path)
        .with_context(|| format!("failed to remove prior wipe timestamp: {}", path.display()))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, timestamp_ms.to_string())
        .with_context(|| format!("failed to write wipe timestamp: {}", path.display()))
}
