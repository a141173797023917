use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use worldkeeper_flows::{LogLevel, ResetReport, UpdateReport};
use worldkeeper_service::{InstallOutcome, SyncOutcome};
use worldkeeper_state::DatabaseChange;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn style(self) -> OutputStyle {
        self.style
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        let line = render_status_line(self.style, status, message);
        match self.style {
            OutputStyle::Plain => println!("{line}"),
            OutputStyle::Rich => println!("{}", colorize_badge(status, &line)),
        }
    }

    pub(crate) fn print_record(self, level: LogLevel, message: &str) {
        self.print_status(level_status(level), message);
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Rich {
            println!();
            println!("{}", colorize(section_style(), &format!("== {title} ==")));
        }
    }

    /// Blocks for `duration`, with a spinner on rich terminals.
    pub(crate) fn settle(self, duration: Duration) {
        if self.style == OutputStyle::Plain {
            std::thread::sleep(duration);
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}") {
            spinner.set_style(style.tick_chars("|/-\\ "));
        }
        spinner.set_message("waiting for the service to release its files");
        spinner.enable_steady_tick(Duration::from_millis(80));
        std::thread::sleep(duration);
        spinner.finish_and_clear();
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(std::io::stdout().is_terminal(), no_color)
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, no_color: bool) -> OutputStyle {
    if stdout_is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn level_status(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "step",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

pub(crate) fn format_update_summary_line(report: &UpdateReport) -> String {
    let source = match &report.sync {
        SyncOutcome::Updated { to, .. } => format!("updated to {to}"),
        SyncOutcome::UpToDate { head } => format!("up-to-date at {head}"),
    };
    let dependencies = match &report.install {
        InstallOutcome::Installed { .. } => "installed",
        InstallOutcome::AlreadySatisfied => "satisfied",
    };
    format!("update complete: source={source} dependencies={dependencies} restart=accepted")
}

pub(crate) fn format_reset_summary_lines(report: &ResetReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();
    let (status, headline) = if report.is_degraded() {
        ("warn", "reset complete (degraded)")
    } else {
        ("ok", "reset complete")
    };
    lines.push(render_status_line(
        style,
        status,
        &format!(
            "{headline}: strategy={} reached={}",
            report.strategy.as_str(),
            report.reached
        ),
    ));

    let backup = match &report.snapshot {
        Some(snapshot) => format!(
            "backup: {} ({} bytes)",
            snapshot.path.display(),
            snapshot.bytes
        ),
        None => "backup: none".to_string(),
    };
    lines.push(render_status_line(style, "step", &backup));

    let database = match &report.database_change {
        DatabaseChange::Deleted => "database: deleted".to_string(),
        DatabaseChange::AlreadyAbsent => "database: already absent".to_string(),
        DatabaseChange::Restored { template, .. } => {
            format!("database: restored from {}", template.display())
        }
        DatabaseChange::Untouched => "database: cleaned in place".to_string(),
    };
    lines.push(render_status_line(style, "step", &database));

    if report.previous_wipe_ms.is_some() {
        lines.push(render_status_line(
            style,
            "step",
            &format!("previous wipe: {} ago", report.since_previous_wipe),
        ));
    } else {
        lines.push(render_status_line(style, "step", "previous wipe: never"));
    }

    for degradation in &report.degradations {
        lines.push(render_status_line(style, "warn", &degradation.to_string()));
    }
    lines
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "error" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightCyan,
    };
    Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
}

fn colorize_badge(status: &str, line: &str) -> String {
    let badge = status_badge(status);
    match line.strip_prefix(badge) {
        Some(rest) => format!("{}{rest}", colorize(badge_style(status), badge)),
        None => line.to_string(),
    }
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
