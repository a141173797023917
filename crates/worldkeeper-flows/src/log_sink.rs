use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

type Observer = Box<dyn FnMut(LogLevel, &str)>;

/// Append-only, timestamped run log shared by every orchestrator.
///
/// Each record is one `[YYYY-MM-DD HH:MM:SS] message` line, flushed as soon
/// as it is written. Records are also mirrored to `tracing`.
pub struct LogSink {
    file: Option<(PathBuf, File)>,
    records: Vec<String>,
    observer: Option<Observer>,
}

impl LogSink {
    /// Opens (or creates) the log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log sink {}", path.display()))?;

        Ok(Self {
            file: Some((path.to_path_buf(), file)),
            records: Vec::new(),
            observer: None,
        })
    }

    /// A sink that only keeps records in memory.
    pub fn memory() -> Self {
        Self {
            file: None,
            records: Vec::new(),
            observer: None,
        }
    }

    /// Called with every message as it is recorded, e.g. for terminal output.
    pub fn with_observer(mut self, observer: impl FnMut(LogLevel, &str) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|(path, _)| path.as_path())
    }

    /// Records written by this process, oldest first.
    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.write(LogLevel::Error, message.as_ref());
    }

    fn write(&mut self, level: LogLevel, message: &str) {
        let message = single_line(message);
        match level {
            LogLevel::Info => tracing::info!(target: "worldkeeper::run", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "worldkeeper::run", "{message}"),
            LogLevel::Error => tracing::error!(target: "worldkeeper::run", "{message}"),
        }

        let record = format_record(Local::now().naive_local(), &message);
        if let Some((path, file)) = &mut self.file {
            let written = (|| -> std::io::Result<()> {
                file.write_all(record.as_bytes())?;
                file.write_all(b"\n")?;
                file.flush()
            })();
            if let Err(err) = written {
                tracing::error!(
                    path = %path.display(),
                    error = %err,
                    "failed to append to log sink"
                );
            }
        }
        self.records.push(record);

        if let Some(observer) = &mut self.observer {
            observer(level, &message);
        }
    }
}

pub fn format_record(timestamp: NaiveDateTime, message: &str) -> String {
    format!("[{}] {message}", timestamp.format("%Y-%m-%d %H:%M:%S"))
}

fn single_line(message: &str) -> String {
    let lines = message
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();
    lines.join(" | ")
}
