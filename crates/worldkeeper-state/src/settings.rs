use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::write_then_replace;

pub const DEFAULT_HOME_KEY: &str = "DEFAULT_HOME";
pub const START_LOCATION_KEY: &str = "START_LOCATION";

const SPAWN_KEYS: [&str; 2] = [DEFAULT_HOME_KEY, START_LOCATION_KEY];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnRewrite {
    pub replaced: usize,
    /// Extra bindings dropped, or neutralised to `pass` when indented.
    pub removed_duplicates: usize,
    pub appended: usize,
}

/// Settings content rebound in memory and not yet written back.
#[derive(Debug, Clone)]
pub struct StagedSpawnRewrite {
    path: PathBuf,
    rewritten: Option<String>,
    summary: SpawnRewrite,
}

impl StagedSpawnRewrite {
    pub fn summary(&self) -> SpawnRewrite {
        self.summary
    }

    /// Writes the staged content. Unchanged settings are left alone.
    pub fn commit(self) -> Result<SpawnRewrite> {
        if let Some(rewritten) = &self.rewritten {
            write_then_replace(&self.path, rewritten.as_bytes())
                .with_context(|| format!("failed to rewrite settings: {}", self.path.display()))?;
        }
        Ok(self.summary)
    }
}

/// Reads the settings artifact and computes the rebinding without writing.
pub fn stage_spawn_rewrite(settings: &Path, canonical: &str) -> Result<StagedSpawnRewrite> {
    let content = fs::read_to_string(settings)
        .with_context(|| format!("failed to read settings: {}", settings.display()))?;
    let (rewritten, summary) = rewrite_spawn_lines(&content, canonical);
    Ok(StagedSpawnRewrite {
        path: settings.to_path_buf(),
        rewritten: (rewritten != content).then_some(rewritten),
        summary,
    })
}

/// Rebinds both spawn keys in the settings artifact to `canonical`.
pub fn rewrite_spawn_locations(settings: &Path, canonical: &str) -> Result<SpawnRewrite> {
    stage_spawn_rewrite(settings, canonical)?.commit()
}

/// Whole-line substitution over every binding of a spawn key, indented or
/// type-annotated ones included.
///
/// The first unindented binding of each key becomes `KEY = "canonical"`.
/// Later unindented bindings are dropped and indented ones become `pass` at
/// their own indentation, so enclosing blocks stay well formed. Keys with no
/// unindented binding get one appended. Leaves exactly one binding per key,
/// and it is unconditional.
pub fn rewrite_spawn_lines(content: &str, canonical: &str) -> (String, SpawnRewrite) {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut kept: [Option<usize>; SPAWN_KEYS.len()] = [None; SPAWN_KEYS.len()];
    for (number, line) in lines.iter().enumerate() {
        let (body, _) = split_line_ending(line);
        if let Some((index, "")) = parse_binding(body) {
            kept[index].get_or_insert(number);
        }
    }

    let mut output = String::with_capacity(content.len() + 64);
    let mut summary = SpawnRewrite::default();
    for (number, line) in lines.iter().enumerate() {
        let (body, ending) = split_line_ending(line);
        match parse_binding(body) {
            Some((index, _)) if kept[index] == Some(number) => {
                summary.replaced += 1;
                output.push_str(&binding_line(SPAWN_KEYS[index], canonical));
                output.push_str(ending);
            }
            Some((_, "")) => summary.removed_duplicates += 1,
            Some((_, indent)) => {
                summary.removed_duplicates += 1;
                output.push_str(indent);
                output.push_str("pass");
                output.push_str(ending);
            }
            None => output.push_str(line),
        }
    }

    for (index, key) in SPAWN_KEYS.iter().enumerate() {
        if kept[index].is_some() {
            continue;
        }
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&binding_line(key, canonical));
        output.push('\n');
        summary.appended += 1;
    }

    (output, summary)
}

fn binding_line(key: &str, canonical: &str) -> String {
    format!("{key} = \"{canonical}\"")
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Matches `KEY = ...` and `KEY: annotation = ...` after any indentation.
/// Returns the key index and the indentation.
fn parse_binding(body: &str) -> Option<(usize, &str)> {
    let statement = body.trim_start();
    let indent = &body[..body.len() - statement.len()];
    let index = SPAWN_KEYS.iter().position(|key| {
        statement
            .strip_prefix(key)
            .is_some_and(|rest| is_assignment_tail(rest))
    })?;
    Some((index, indent))
}

fn is_assignment_tail(rest: &str) -> bool {
    if rest.starts_with(|ch: char| ch.is_alphanumeric() || ch == '_') {
        return false;
    }
    let rest = rest.trim_start();
    let rest = match rest.strip_prefix(':') {
        Some(annotated) => match annotated.find('=') {
            Some(at) => &annotated[at..],
            None => return false,
        },
        None => rest,
    };
    rest.starts_with('=') && !rest.starts_with("==")
}
