use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use semver::Version;
use worldkeeper_core::{bump_version, parse_version_file, BumpSelector, RunConfiguration};
use worldkeeper_flows::LogSink;
use worldkeeper_service::{git_commit_paths, git_create_tag, git_push_with_tags};
use worldkeeper_state::write_then_replace;

const DEFAULT_CHANGELOG_TITLE: &str = "# Changelog\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReleaseOutcome {
    pub(crate) previous: Version,
    pub(crate) next: Version,
    pub(crate) tag: String,
    pub(crate) published: bool,
}

/// Bumps the version file, prepends a changelog section and optionally
/// commits, tags and pushes both files.
pub(crate) fn run_release(
    config: &RunConfiguration,
    selector: BumpSelector,
    notes: &[String],
    publish: bool,
    date: NaiveDate,
    log: &mut LogSink,
) -> Result<ReleaseOutcome> {
    let notes = normalize_notes(notes);
    if notes.is_empty() {
        anyhow::bail!("at least one non-empty --note is required for a release");
    }

    let raw_version = fs::read_to_string(&config.version_file).with_context(|| {
        format!(
            "failed reading version file: {}",
            config.version_file.display()
        )
    })?;
    let previous = parse_version_file(&raw_version)
        .with_context(|| format!("invalid version file: {}", config.version_file.display()))?;
    let next = bump_version(&previous, selector);
    let tag = format!("v{next}");
    log.info(format!(
        "release: {} bump {previous} -> {next}",
        selector.as_str()
    ));

    let existing_changelog = read_optional(&config.changelog)?;
    let changelog = insert_changelog_entry(
        existing_changelog.as_deref().unwrap_or(DEFAULT_CHANGELOG_TITLE),
        &next,
        date,
        &notes,
    );

    let version_line = if raw_version.trim_start().starts_with('v') {
        format!("{tag}\n")
    } else {
        format!("{next}\n")
    };
    write_then_replace(&config.version_file, version_line.as_bytes())?;
    write_then_replace(&config.changelog, changelog.as_bytes())?;
    log.info(format!(
        "release: wrote {} and {}",
        config.version_file.display(),
        config.changelog.display()
    ));

    if publish {
        let repo = config.working_dir.as_path();
        git_commit_paths(
            repo,
            &[config.version_file.as_path(), config.changelog.as_path()],
            &format!("release {tag}"),
        )?;
        git_create_tag(repo, &tag, &format!("release {tag}"))?;
        git_push_with_tags(repo)?;
        log.info(format!("release: published {tag}"));
    } else {
        log.info(format!("release: {tag} prepared, publishing skipped"));
    }

    Ok(ReleaseOutcome {
        previous,
        next,
        tag,
        published: publish,
    })
}

/// New section goes directly below a leading `# ` title, or at the top.
pub(crate) fn insert_changelog_entry(
    existing: &str,
    version: &Version,
    date: NaiveDate,
    notes: &[String],
) -> String {
    let mut entry = format!("## [{version}] - {}\n", date.format("%Y-%m-%d"));
    for note in notes {
        entry.push_str("- ");
        entry.push_str(note);
        entry.push('\n');
    }

    let (title, rest) = split_title(existing);
    let rest = rest.trim_start_matches(['\r', '\n']);
    let mut output = String::with_capacity(existing.len() + entry.len() + 2);
    if let Some(title) = title {
        output.push_str(title);
        if !title.ends_with('\n') {
            output.push('\n');
        }
        output.push('\n');
    }
    output.push_str(&entry);
    if !rest.is_empty() {
        output.push('\n');
        output.push_str(rest);
    }
    output
}

fn split_title(content: &str) -> (Option<&str>, &str) {
    if !content.starts_with("# ") {
        return (None, content);
    }
    match content.find('\n') {
        Some(index) => (Some(&content[..=index]), &content[index + 1..]),
        None => (Some(content), ""),
    }
}

fn normalize_notes(notes: &[String]) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            note.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|note| !note.is_empty())
        .collect()
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
    }
}
