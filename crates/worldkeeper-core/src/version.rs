use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use semver::{BuildMetadata, Prerelease, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpSelector {
    Major,
    Minor,
    Patch,
}

impl BumpSelector {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl FromStr for BumpSelector {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            other => Err(anyhow!(
                "invalid bump selector '{other}': expected major, minor or patch"
            )),
        }
    }
}

/// Increments the selected component and zeroes every lower-order one.
pub fn bump_version(current: &Version, selector: BumpSelector) -> Version {
    let mut next = Version::new(current.major, current.minor, current.patch);
    match selector {
        BumpSelector::Major => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
        }
        BumpSelector::Minor => {
            next.minor += 1;
            next.patch = 0;
        }
        BumpSelector::Patch => next.patch += 1,
    }
    next.pre = Prerelease::EMPTY;
    next.build = BuildMetadata::EMPTY;
    next
}

/// Parses a version file holding a single version, optionally `v`-prefixed.
pub fn parse_version_file(content: &str) -> Result<Version> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        anyhow::bail!("version file is empty");
    }
    let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(raw).with_context(|| format!("invalid version '{trimmed}'"))
}
