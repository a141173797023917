use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::Version;

use super::*;

#[test]
fn empty_config_resolves_defaults_against_base_dir() {
    let config = RunConfiguration::from_toml_str("", Path::new("/srv/world"))
        .expect("empty config must resolve");

    assert_eq!(config.working_dir, PathBuf::from("/srv/world"));
    assert_eq!(config.env_dir, PathBuf::from("/srv/world/.venv"));
    assert_eq!(config.launcher, "evennia");
    assert_eq!(
        config.database,
        PathBuf::from("/srv/world/server/evennia.db3")
    );
    assert_eq!(
        config.backup,
        PathBuf::from("/srv/world/server/evennia.db3.bak")
    );
    assert_eq!(config.canonical_location, "#2");
    assert_eq!(config.settle, Duration::from_secs(5));
    assert_eq!(config.strategy, ResetStrategy::Wipe);
    assert_eq!(config.admin, AdminVerbs::default());
    assert!(config.init_script.is_none());
    assert!(config.search_path.is_none());
}

#[test]
fn config_resolves_relative_paths_against_working_dir() {
    let config = RunConfiguration::from_toml_str(
        r#"
[service]
working_dir = "game"
env_dir = "/opt/venv"

[state]
database = "data/world.db3"
backup = "backups/world.db3"
settle_secs = 0

[reset]
strategy = "restore"
template = "data/template.db3"
"#,
        Path::new("/srv"),
    )
    .expect("config must parse");

    assert_eq!(config.working_dir, PathBuf::from("/srv/game"));
    assert_eq!(config.env_dir, PathBuf::from("/opt/venv"));
    assert_eq!(config.database, PathBuf::from("/srv/game/data/world.db3"));
    assert_eq!(config.backup, PathBuf::from("/srv/game/backups/world.db3"));
    assert_eq!(config.settle, Duration::ZERO);
    assert_eq!(
        config.strategy,
        ResetStrategy::Restore {
            template: PathBuf::from("/srv/game/data/template.db3"),
        }
    );
}

#[test]
fn restore_strategy_requires_template() {
    let err = RunConfiguration::from_toml_str("[reset]\nstrategy = \"restore\"\n", Path::new("/"))
        .expect_err("restore without template must fail");
    assert!(err.to_string().contains("reset.template is required"));
}

#[test]
fn cleanup_strategy_requires_non_empty_script() {
    let err = RunConfiguration::from_toml_str(
        "[reset]\nstrategy = \"cleanup\"\nscript = \"  \"\n",
        Path::new("/"),
    )
    .expect_err("blank cleanup script must fail");
    assert!(err.to_string().contains("reset.script must not be empty"));
}

#[test]
fn config_rejects_empty_admin_script_prefix() {
    for input in [
        "[admin]\nscript = []\n",
        "[admin]\nscript = []\n\n[reset]\nstrategy = \"cleanup\"\nscript = \"wipe_npcs()\"\n",
        "[admin]\nscript = []\n\n[reset]\ninit_script = \"seed()\"\n",
    ] {
        let err = RunConfiguration::from_toml_str(input, Path::new("/srv"))
            .expect_err("empty admin.script must fail at load");
        assert!(
            err.to_string()
                .contains("admin.script must name at least one launcher argument"),
            "unexpected error for {input:?}: {err}"
        );
    }
}

#[test]
fn config_rejects_backup_equal_to_database() {
    let err = RunConfiguration::from_toml_str(
        "[state]\ndatabase = \"world.db3\"\nbackup = \"world.db3\"\n",
        Path::new("/srv"),
    )
    .expect_err("backup equal to database must fail");
    assert!(err.to_string().contains("state.backup must differ"));
}

#[test]
fn config_rejects_quoted_canonical_location() {
    let err = RunConfiguration::from_toml_str(
        "[state]\ncanonical_location = 'x\"y'\n",
        Path::new("/srv"),
    )
    .expect_err("quote in canonical location must fail");
    assert!(err.to_string().contains("invalid character"));
}

#[test]
fn config_rejects_unknown_keys() {
    let err = RunConfiguration::from_toml_str("[state]\ndatabse = \"x\"\n", Path::new("/srv"))
        .expect_err("typo must be rejected");
    assert!(format!("{err:#}").contains("databse"));
}

#[test]
fn blank_init_script_is_treated_as_absent() {
    let config =
        RunConfiguration::from_toml_str("[reset]\ninit_script = \"\"\n", Path::new("/srv"))
            .expect("config must parse");
    assert!(config.init_script.is_none());
}

#[test]
fn reset_state_previous_walks_the_state_machine() {
    assert_eq!(ResetState::Stopped.previous(), None);
    assert_eq!(ResetState::BackedUp.previous(), Some(ResetState::Stopped));
    assert_eq!(
        ResetState::Started.previous(),
        Some(ResetState::ProvenanceRecorded)
    );
}

#[test]
fn reset_error_names_step_and_last_completed_state() {
    let err = ResetError::new(
        ResetErrorKind::StateMutation,
        ResetState::Mutated,
        anyhow::anyhow!("disk full"),
    );
    assert_eq!(err.last_completed, Some(ResetState::BackedUp));
    assert_eq!(
        err.to_string(),
        "state-mutation-failed: mutated step failed (last completed state: backed-up): disk full"
    );
}

#[test]
fn update_error_maps_to_step() {
    let err = UpdateError::from(EnvironmentError::MissingInterpreter {
        path: PathBuf::from("/venv/bin/python"),
    });
    assert_eq!(err.step(), UpdateStep::Verify);
    assert_eq!(err.reason_code(), "environment-invalid");
    assert!(err.to_string().contains("/venv/bin/python"));
}

#[test]
fn update_error_chain_prints_environment_message_once() {
    use std::error::Error as _;

    let err = UpdateError::from(EnvironmentError::MissingInterpreter {
        path: PathBuf::from("/venv/bin/python"),
    });
    assert!(err.source().is_none());

    let rendered = format!("{:#}", anyhow::Error::from(err));
    assert_eq!(
        rendered,
        "environment-invalid: interpreter missing or not executable: /venv/bin/python"
    );
    assert_eq!(rendered.matches("interpreter missing").count(), 1);
}

#[test]
fn format_elapsed_picks_largest_whole_unit() {
    assert_eq!(format_elapsed_secs(0), "0 seconds");
    assert_eq!(format_elapsed_secs(1), "1 second");
    assert_eq!(format_elapsed_secs(59), "59 seconds");
    assert_eq!(format_elapsed_secs(300), "5 minutes");
    assert_eq!(format_elapsed_secs(3_600), "1 hour");
    assert_eq!(format_elapsed_secs(2 * 86_400 + 5), "2 days");
    assert_eq!(format_elapsed_secs(15 * 86_400), "2 weeks");
}

#[test]
fn format_elapsed_since_handles_missing_and_future_records() {
    let now_ms = 1_771_000_000_000;
    assert_eq!(format_elapsed_since(Some(now_ms - 300_000), now_ms), "5 minutes");
    assert_eq!(format_elapsed_since(None, now_ms), "0 seconds");
    assert_eq!(format_elapsed_since(Some(now_ms + 10_000), now_ms), "0 seconds");
}

#[test]
fn bump_version_zeroes_lower_components() {
    let current = Version::parse("1.4.7-rc.1+build.9").expect("valid version");
    assert_eq!(
        bump_version(&current, BumpSelector::Major),
        Version::new(2, 0, 0)
    );
    assert_eq!(
        bump_version(&current, BumpSelector::Minor),
        Version::new(1, 5, 0)
    );
    assert_eq!(
        bump_version(&current, BumpSelector::Patch),
        Version::new(1, 4, 8)
    );
}

#[test]
fn bump_selector_parses_case_insensitively() {
    assert_eq!("Minor".parse::<BumpSelector>().unwrap(), BumpSelector::Minor);
    let err = "build".parse::<BumpSelector>().expect_err("unknown selector");
    assert!(err.to_string().contains("invalid bump selector"));
}

#[test]
fn parse_version_file_accepts_v_prefix_and_trailing_newline() {
    assert_eq!(
        parse_version_file("v0.3.1\n").expect("must parse"),
        Version::new(0, 3, 1)
    );
    assert!(parse_version_file("\n").is_err());
    assert!(parse_version_file("one.two").is_err());
}
