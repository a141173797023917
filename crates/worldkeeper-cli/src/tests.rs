use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use clap::error::ErrorKind;
use clap::Parser;
use semver::Version;
use worldkeeper_core::{BumpSelector, Degradation, ResetState, ResetStrategy, RunConfiguration};
use worldkeeper_flows::{LogSink, ResetReport, UpdateReport};
use worldkeeper_service::{InstallOutcome, SyncOutcome, VerifiedEnvironment};
use worldkeeper_state::{DatabaseChange, SnapshotRecord, SpawnRewrite};

use crate::completion::{
    detect_shell_from_env, resolve_completion_shell, write_completions_script,
    CliCompletionShell,
};
use crate::dispatch::{describe_since_wipe, format_since_wipe, load_run_configuration};
use crate::release::{insert_changelog_entry, run_release};
use crate::remote::{interpret_remote_response, normalise_endpoint};
use crate::render::{
    format_reset_summary_lines, format_update_summary_line, render_status_line,
    resolve_output_style, OutputStyle,
};
use crate::telemetry::resolve_filter;
use crate::{Cli, CliBumpSelector, Commands};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[test]
fn cli_parses_reset_flags() {
    let cli = Cli::try_parse_from(["worldkeeper", "reset", "--skip-backup", "--no-init"])
        .expect("command must parse");

    match cli.command {
        Commands::Reset {
            skip_backup,
            no_init,
        } => {
            assert!(skip_backup);
            assert!(no_init);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_reset_defaults_keep_backup_and_init() {
    let cli = Cli::try_parse_from(["worldkeeper", "reset"]).expect("command must parse");

    match cli.command {
        Commands::Reset {
            skip_backup,
            no_init,
        } => {
            assert!(!skip_backup);
            assert!(!no_init);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_accepts_global_config_after_subcommand() {
    let cli = Cli::try_parse_from(["worldkeeper", "update", "--config", "deploy/worldkeeper.toml"])
        .expect("command must parse");

    assert_eq!(cli.config, Some(PathBuf::from("deploy/worldkeeper.toml")));
    assert!(matches!(cli.command, Commands::Update));
}

#[test]
fn cli_parses_release_with_repeated_notes() {
    let cli = Cli::try_parse_from([
        "worldkeeper",
        "release",
        "minor",
        "--note",
        "weather follows the island clock",
        "--note",
        "harbor exits fixed",
        "--no-publish",
    ])
    .expect("command must parse");

    match cli.command {
        Commands::Release {
            selector,
            notes,
            no_publish,
        } => {
            assert_eq!(selector, CliBumpSelector::Minor);
            assert_eq!(BumpSelector::from(selector), BumpSelector::Minor);
            assert_eq!(notes.len(), 2);
            assert!(no_publish);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_rejects_release_without_notes() {
    let err = Cli::try_parse_from(["worldkeeper", "release", "patch"])
        .expect_err("release without notes must fail");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn cli_rejects_unknown_bump_selector() {
    let err = Cli::try_parse_from(["worldkeeper", "release", "huge", "--note", "x"])
        .expect_err("unknown selector must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn cli_parses_remote_update_with_explicit_token() {
    let cli = Cli::try_parse_from([
        "worldkeeper",
        "remote-update",
        "--endpoint",
        "https://world.example.test/sync",
        "--token",
        "s3cret",
    ])
    .expect("command must parse");

    match cli.command {
        Commands::RemoteUpdate { endpoint, token } => {
            assert_eq!(endpoint, "https://world.example.test/sync");
            assert_eq!(token, "s3cret");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "reset complete"),
        "reset complete"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "reset complete"),
        "[OK] reset complete"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "initialization failed"),
        "[WARN] initialization failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "error", "sync failed"),
        "[ERR] sync failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "reset: stopped"),
        "[..] reset: stopped"
    );
}

#[test]
fn resolve_output_style_uses_rich_only_on_a_color_terminal() {
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn format_update_summary_line_reports_noop_update() {
    let report = UpdateReport {
        sync: SyncOutcome::UpToDate {
            head: "ba9876543210".to_string(),
        },
        environment: VerifiedEnvironment {
            env_dir: PathBuf::from(".venv"),
            interpreter: PathBuf::from(".venv/bin/python"),
            launcher: PathBuf::from(".venv/bin/evennia"),
        },
        install: InstallOutcome::AlreadySatisfied,
    };
    assert_eq!(
        format_update_summary_line(&report),
        "update complete: source=up-to-date at ba9876543210 dependencies=satisfied restart=accepted"
    );
}

#[test]
fn format_reset_summary_lines_flags_degradations() {
    let report = sample_reset_report(vec![Degradation::Initialization(
        "admin channel rejected script".to_string(),
    )]);
    let lines = format_reset_summary_lines(&report, OutputStyle::Rich);

    assert_eq!(
        lines[0],
        "[WARN] reset complete (degraded): strategy=restore reached=started"
    );
    assert_eq!(lines[1], "[..] backup: server/evennia.db3.bak (10240 bytes)");
    assert_eq!(lines[2], "[..] database: restored from template.db3");
    assert_eq!(lines[3], "[..] previous wipe: 2 days ago");
    assert_eq!(
        lines[4],
        "[WARN] initialization-failed: admin channel rejected script"
    );
}

#[test]
fn format_reset_summary_lines_plain_has_no_badges() {
    let report = sample_reset_report(Vec::new());
    let lines = format_reset_summary_lines(&report, OutputStyle::Plain);

    assert_eq!(lines[0], "reset complete: strategy=restore reached=started");
    assert_eq!(lines.len(), 4);
}

#[test]
fn format_since_wipe_handles_missing_record() {
    assert_eq!(format_since_wipe(None, 5_000), "last wipe: never");
    assert_eq!(
        format_since_wipe(Some(1_000), 1_000 + 90 * 60 * 1000),
        "last wipe: 1 hour ago"
    );
}

#[test]
fn since_wipe_falls_back_to_never_for_corrupt_record() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create root");
    let record = root.join("last_wipe_timestamp");
    fs::write(&record, "garbage\n").expect("must write record");

    let since = describe_since_wipe(&record, 5_000);
    assert_eq!(since.line, "last wipe: never");
    let warning = since.warning.expect("corrupt record must warn");
    assert!(warning.contains("not an integer"));

    fs::write(&record, "1000\n").expect("must write record");
    let since = describe_since_wipe(&record, 1_000 + 2 * 24 * 60 * 60 * 1000);
    assert_eq!(since.line, "last wipe: 2 days ago");
    assert!(since.warning.is_none());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn changelog_entry_goes_below_title() {
    let existing = "# Changelog\n\n## [1.2.3] - 2024-01-02\n- earlier change\n";
    let updated = insert_changelog_entry(
        existing,
        &Version::new(1, 3, 0),
        date(2024, 3, 9),
        &["new weather".to_string(), "harbor fix".to_string()],
    );
    assert_eq!(
        updated,
        "# Changelog\n\n## [1.3.0] - 2024-03-09\n- new weather\n- harbor fix\n\n## [1.2.3] - 2024-01-02\n- earlier change\n"
    );
}

#[test]
fn changelog_entry_without_title_goes_first() {
    let updated = insert_changelog_entry(
        "## [0.1.0] - 2024-01-01\n- first\n",
        &Version::new(0, 1, 1),
        date(2024, 1, 5),
        &["patch".to_string()],
    );
    assert_eq!(
        updated,
        "## [0.1.1] - 2024-01-05\n- patch\n\n## [0.1.0] - 2024-01-01\n- first\n"
    );
}

#[test]
fn release_without_publish_bumps_version_and_creates_changelog() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create root");
    let config = RunConfiguration::for_working_dir(&root).expect("default config must resolve");
    fs::write(&config.version_file, "v1.4.2\n").expect("must write version");

    let mut log = LogSink::memory();
    let outcome = run_release(
        &config,
        BumpSelector::Major,
        &["world reset tooling".to_string(), "  ".to_string()],
        false,
        date(2024, 6, 1),
        &mut log,
    )
    .expect("release must succeed");

    assert_eq!(outcome.previous, Version::new(1, 4, 2));
    assert_eq!(outcome.next, Version::new(2, 0, 0));
    assert_eq!(outcome.tag, "v2.0.0");
    assert!(!outcome.published);
    assert_eq!(
        fs::read_to_string(&config.version_file).expect("must read version"),
        "v2.0.0\n"
    );
    assert_eq!(
        fs::read_to_string(&config.changelog).expect("must read changelog"),
        "# Changelog\n\n## [2.0.0] - 2024-06-01\n- world reset tooling\n"
    );
    assert!(log
        .records()
        .iter()
        .any(|record| record.contains("publishing skipped")));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn release_requires_a_non_empty_note() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create root");
    let config = RunConfiguration::for_working_dir(&root).expect("default config must resolve");
    fs::write(&config.version_file, "0.3.0").expect("must write version");

    let mut log = LogSink::memory();
    let err = run_release(
        &config,
        BumpSelector::Patch,
        &[" ".to_string()],
        false,
        date(2024, 6, 1),
        &mut log,
    )
    .expect_err("blank notes must be rejected");
    assert!(err.to_string().contains("at least one non-empty --note"));
    assert_eq!(
        fs::read_to_string(&config.version_file).expect("must read version"),
        "0.3.0"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn remote_response_success_renders_status() {
    let status = interpret_remote_response("http://host/sync", 200, r#"{"status": "success"}"#)
        .expect("2xx must succeed");
    assert_eq!(status, "success");

    let fallback = interpret_remote_response("http://host/sync", 204, "")
        .expect("empty 2xx must succeed");
    assert_eq!(fallback, "success");
}

#[test]
fn remote_response_failure_renders_error_field() {
    let err = interpret_remote_response("http://host/sync", 401, r#"{"error": "Invalid token"}"#)
        .expect_err("401 must fail");
    assert_eq!(
        err.to_string(),
        "remote update rejected by http://host/sync: http 401: Invalid token"
    );

    let err = interpret_remote_response("http://host/sync", 502, "bad gateway\n")
        .expect_err("502 must fail");
    assert!(err.to_string().ends_with("http 502: bad gateway"));
}

#[test]
fn normalise_endpoint_adds_scheme_and_trims_slash() {
    assert_eq!(
        normalise_endpoint("world.example.test:5000/sync/").expect("must normalise"),
        "http://world.example.test:5000/sync"
    );
    assert_eq!(
        normalise_endpoint("https://world.example.test/sync").expect("must normalise"),
        "https://world.example.test/sync"
    );
    assert!(normalise_endpoint("  ").is_err());
}

#[test]
fn completions_script_names_the_binary() {
    let mut output = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut output)
        .expect("must generate completions");
    let script = String::from_utf8(output).expect("script must be utf-8");
    assert!(script.contains("worldkeeper"));
    assert!(script.contains("since-wipe"));
}

#[test]
fn completion_shell_resolution_prefers_request_then_env() {
    assert_eq!(
        detect_shell_from_env(Some("/usr/bin/zsh")),
        Some(CliCompletionShell::Zsh)
    );
    assert_eq!(
        detect_shell_from_env(Some("pwsh")),
        Some(CliCompletionShell::Powershell)
    );
    assert_eq!(detect_shell_from_env(Some("/bin/tcsh")), None);
    assert_eq!(
        resolve_completion_shell(Some(CliCompletionShell::Fish), Some("/bin/zsh"), false),
        CliCompletionShell::Fish
    );
    assert_eq!(
        resolve_completion_shell(None, Some("/bin/zsh"), false),
        CliCompletionShell::Zsh
    );
    assert_eq!(
        resolve_completion_shell(None, None, true),
        CliCompletionShell::Powershell
    );
    assert_eq!(
        resolve_completion_shell(None, None, false),
        CliCompletionShell::Bash
    );
}

#[test]
fn explicit_config_path_must_exist() {
    let root = test_root();
    let err = load_run_configuration(Some(&root.join("worldkeeper.toml")))
        .expect_err("missing explicit config must fail");
    assert!(err.to_string().contains("failed reading config"));
}

#[test]
fn invalid_log_directive_falls_back_to_default() {
    let filter = resolve_filter(Some("worldkeeper=[[["));
    assert!(filter.to_string().contains("warn"));
    let filter = resolve_filter(None);
    assert!(filter.to_string().contains("worldkeeper::run=off"));
}

fn sample_reset_report(degradations: Vec<Degradation>) -> ResetReport {
    ResetReport {
        strategy: ResetStrategy::Restore {
            template: PathBuf::from("template.db3"),
        },
        reached: ResetState::Started,
        snapshot: Some(SnapshotRecord {
            path: PathBuf::from("server/evennia.db3.bak"),
            sha256: "ab".repeat(32),
            bytes: 10 * 1024,
        }),
        database_change: DatabaseChange::Restored {
            template: PathBuf::from("template.db3"),
            sha256: "cd".repeat(32),
        },
        cleanup_output: None,
        spawn: SpawnRewrite {
            replaced: 2,
            removed_duplicates: 0,
            appended: 0,
        },
        wipe_timestamp_ms: Some(1_700_000_000_000),
        previous_wipe_ms: Some(1_699_800_000_000),
        since_previous_wipe: "2 days".to_string(),
        init_output: None,
        degradations,
        elapsed: std::time::Duration::from_secs(6),
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn test_root() -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "worldkeeper-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
