use std::fmt;
use std::path::PathBuf;

/// How the Mutated state transforms persistent world state.
///
/// Selected once when the configuration is resolved; the reset flow
/// dispatches on it exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetStrategy {
    /// Delete the live database outright.
    Wipe,
    /// Replace the live database with a prepared template database.
    Restore { template: PathBuf },
    /// Run a cleanup routine through the admin channel; the file is untouched.
    Cleanup { script: String },
}

impl ResetStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wipe => "wipe",
            Self::Restore { .. } => "restore",
            Self::Cleanup { .. } => "cleanup",
        }
    }

    pub fn touches_database_file(&self) -> bool {
        !matches!(self, Self::Cleanup { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResetState {
    Stopped,
    BackedUp,
    Mutated,
    ProvenanceRecorded,
    Started,
}

impl ResetState {
    pub const ORDER: [ResetState; 5] = [
        Self::Stopped,
        Self::BackedUp,
        Self::Mutated,
        Self::ProvenanceRecorded,
        Self::Started,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::BackedUp => "backed-up",
            Self::Mutated => "mutated",
            Self::ProvenanceRecorded => "provenance-recorded",
            Self::Started => "started",
        }
    }

    pub fn previous(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|state| *state == self)?;
        index.checked_sub(1).map(|prev| Self::ORDER[prev])
    }
}

impl fmt::Display for ResetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
