mod channel;
mod command;
mod environment;
mod git_ops;
mod installer;

pub use channel::{AdminChannel, ChannelConnector, LauncherChannel, LauncherConnector};
pub use environment::{
    verify_environment, EnvironmentVerifier, FilesystemVerifier, VerifiedEnvironment,
};
pub use git_ops::{
    git_commit_paths, git_create_tag, git_head, git_push_with_tags, GitSync, SourceSync,
    SyncOutcome,
};
pub use installer::{classify_pip_output, DependencyInstaller, InstallOutcome, PipInstaller};
