mod config;
mod elapsed;
mod error;
mod reset;
mod version;

pub use config::{AdminVerbs, RunConfiguration, DEFAULT_CONFIG_FILE};
pub use elapsed::{format_elapsed_secs, format_elapsed_since};
pub use error::{Degradation, EnvironmentError, ResetError, ResetErrorKind, UpdateError, UpdateStep};
pub use reset::{ResetState, ResetStrategy};
pub use version::{bump_version, parse_version_file, BumpSelector};

#[cfg(test)]
mod tests;
