use std::time::{Duration, Instant};

use anyhow::Context;
use worldkeeper_core::{
    format_elapsed_since, format_elapsed_secs, Degradation, ResetError, ResetErrorKind,
    ResetState, ResetStrategy, RunConfiguration,
};
use worldkeeper_service::AdminChannel;
use worldkeeper_state::{
    apply_database_strategy, current_unix_millis, read_wipe_timestamp, record_wipe_timestamp,
    snapshot_database, stage_spawn_rewrite, DatabaseChange, SnapshotRecord, SpawnRewrite,
    StateLayout,
};

use crate::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetOptions {
    /// Destroy state without taking a snapshot first.
    pub skip_backup: bool,
    /// Run the configured one-time initialization routine after start.
    pub run_init: bool,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            skip_backup: false,
            run_init: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub strategy: ResetStrategy,
    pub reached: ResetState,
    pub snapshot: Option<SnapshotRecord>,
    pub database_change: DatabaseChange,
    pub cleanup_output: Option<String>,
    pub spawn: SpawnRewrite,
    pub wipe_timestamp_ms: Option<u64>,
    pub previous_wipe_ms: Option<u64>,
    pub since_previous_wipe: String,
    pub init_output: Option<String>,
    pub degradations: Vec<Degradation>,
    pub elapsed: Duration,
}

impl ResetReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

type Pause<'a> = Box<dyn FnMut(Duration) + 'a>;

/// Drives `Stopped → BackedUp → Mutated → ProvenanceRecorded → Started`.
///
/// A hard failure returns immediately; the error names the failed step and
/// the last state that completed.
pub struct ResetOrchestrator<'a> {
    config: &'a RunConfiguration,
    channel: &'a mut dyn AdminChannel,
    options: ResetOptions,
    pause: Pause<'a>,
}

impl<'a> ResetOrchestrator<'a> {
    pub fn new(
        config: &'a RunConfiguration,
        channel: &'a mut dyn AdminChannel,
        options: ResetOptions,
    ) -> Self {
        Self {
            config,
            channel,
            options,
            pause: Box::new(std::thread::sleep),
        }
    }

    /// Replaces the blocking settle wait, e.g. with a spinner.
    pub fn with_pause(mut self, pause: impl FnMut(Duration) + 'a) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn run(&mut self, log: &mut LogSink) -> Result<ResetReport, ResetError> {
        let started_at = Instant::now();
        let config = self.config;
        let layout = StateLayout::from_config(config);
        log.info(format!(
            "reset: starting with strategy '{}' on {}",
            config.strategy.as_str(),
            layout.database().display()
        ));

        let previous_wipe_ms = match read_wipe_timestamp(layout.wipe_timestamp()) {
            Ok(previous) => previous,
            Err(err) => {
                log.warn(format!("reset: previous wipe record unreadable: {err:#}"));
                None
            }
        };

        let result = self.run_states(log, &layout);
        let mut report = match result {
            Ok(report) => report,
            Err(err) => {
                log.error(format!("reset: {err}"));
                log.error(format!(
                    "reset: aborted at step {} (reason={})",
                    err.step,
                    err.kind.reason_code()
                ));
                return Err(err);
            }
        };

        report.previous_wipe_ms = previous_wipe_ms;
        let now_ms = report
            .wipe_timestamp_ms
            .or_else(|| current_unix_millis().ok())
            .unwrap_or(0);
        report.since_previous_wipe = format_elapsed_since(previous_wipe_ms, now_ms);
        if previous_wipe_ms.is_some() {
            log.info(format!(
                "reset: {} since previous wipe",
                report.since_previous_wipe
            ));
        } else {
            log.info("reset: no previous wipe on record");
        }

        report.elapsed = started_at.elapsed();
        let took = format_elapsed_secs(report.elapsed.as_secs());
        if report.is_degraded() {
            for degradation in &report.degradations {
                log.warn(format!("reset: degraded: {degradation}"));
            }
            log.warn(format!("reset: complete with degradations in {took}"));
        } else {
            log.info(format!("reset: complete in {took}"));
        }
        Ok(report)
    }

    fn run_states(
        &mut self,
        log: &mut LogSink,
        layout: &StateLayout,
    ) -> Result<ResetReport, ResetError> {
        let config = self.config;
        let mut degradations = Vec::new();

        log.info("reset: stopped: signalling service to stop");
        self.channel
            .stop()
            .map_err(|err| process_control(ResetState::Stopped, err))?;
        if !config.settle.is_zero() {
            log.info(format!(
                "reset: stopped: settling for {}",
                format_elapsed_secs(config.settle.as_secs())
            ));
            (self.pause)(config.settle);
        }
        log.info("reset: stopped");

        let snapshot = if self.options.skip_backup {
            if config.strategy.touches_database_file() {
                log.warn(format!(
                    "reset: backed-up: skipped by operator request, {} will be replaced without a snapshot",
                    layout.database().display()
                ));
            } else {
                log.warn("reset: backed-up: skipped by operator request, no snapshot taken");
            }
            None
        } else {
            let snapshot = snapshot_database(layout)
                .map_err(|err| state_mutation(ResetState::BackedUp, err))?;
            match &snapshot {
                Some(record) => log.info(format!(
                    "reset: backed-up: {} ({} bytes, sha256 {})",
                    record.path.display(),
                    record.bytes,
                    record.sha256
                )),
                None => log.warn(format!(
                    "reset: backed-up: no live database at {}, nothing to snapshot",
                    layout.database().display()
                )),
            }
            snapshot
        };

        // Settings are read and rebound before the database changes so a broken
        // settings artifact aborts the run with the database intact.
        let staged_spawn = stage_spawn_rewrite(layout.settings(), &config.canonical_location)
            .map_err(|err| state_mutation(ResetState::Mutated, err))?;

        let database_change = apply_database_strategy(layout, &config.strategy)
            .map_err(|err| state_mutation(ResetState::Mutated, err))?;
        match &database_change {
            DatabaseChange::Deleted => log.info("reset: mutated: database deleted"),
            DatabaseChange::AlreadyAbsent => {
                log.info("reset: mutated: database already absent")
            }
            DatabaseChange::Restored { template, sha256 } => log.info(format!(
                "reset: mutated: database restored from {} (sha256 {sha256})",
                template.display()
            )),
            DatabaseChange::Untouched => {}
        }

        let cleanup_output = match &config.strategy {
            ResetStrategy::Cleanup { script } => {
                log.info("reset: mutated: running cleanup routine over admin channel");
                let output = self
                    .channel
                    .run_admin_script(script)
                    .context("world cleanup routine failed")
                    .map_err(|err| state_mutation(ResetState::Mutated, err))?;
                if !output.is_empty() {
                    log.info(format!("reset: mutated: cleanup output: {output}"));
                }
                Some(output)
            }
            _ => None,
        };

        let spawn = staged_spawn
            .commit()
            .map_err(|err| state_mutation(ResetState::Mutated, err))?;
        log.info(format!(
            "reset: mutated: spawn locations set to '{}' (replaced={} removed={} appended={})",
            config.canonical_location, spawn.replaced, spawn.removed_duplicates, spawn.appended
        ));

        let wipe_timestamp_ms = match current_unix_millis()
            .and_then(|now| record_wipe_timestamp(layout.wipe_timestamp(), now).map(|()| now))
        {
            Ok(now) => {
                log.info(format!("reset: provenance-recorded: {now}"));
                Some(now)
            }
            Err(err) => {
                log.warn(format!("reset: provenance-recorded: failed: {err:#}"));
                degradations.push(Degradation::Provenance(format!("{err:#}")));
                None
            }
        };

        log.info("reset: started: signalling service to start");
        self.channel
            .start()
            .map_err(|err| process_control(ResetState::Started, err))?;
        log.info("reset: started");

        let init_output = match config.init_script.as_deref() {
            Some(script) if self.options.run_init => {
                log.info("reset: started: running one-time initialization");
                match self.channel.run_admin_script(script) {
                    Ok(output) => {
                        if !output.is_empty() {
                            log.info(format!("reset: started: initialization output: {output}"));
                        }
                        Some(output)
                    }
                    Err(err) => {
                        log.warn(format!("reset: started: initialization failed: {err:#}"));
                        degradations.push(Degradation::Initialization(format!("{err:#}")));
                        None
                    }
                }
            }
            Some(_) => {
                log.info("reset: started: initialization disabled for this run");
                None
            }
            None => None,
        };

        Ok(ResetReport {
            strategy: config.strategy.clone(),
            reached: ResetState::Started,
            snapshot,
            database_change,
            cleanup_output,
            spawn,
            wipe_timestamp_ms,
            previous_wipe_ms: None,
            since_previous_wipe: String::new(),
            init_output,
            degradations,
            elapsed: Duration::ZERO,
        })
    }
}

fn process_control(step: ResetState, err: anyhow::Error) -> ResetError {
    ResetError::new(ResetErrorKind::ProcessControl, step, err)
}

fn state_mutation(step: ResetState, err: anyhow::Error) -> ResetError {
    ResetError::new(ResetErrorKind::StateMutation, step, err)
}
