use std::process::Command;

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Default)]
pub(crate) struct CommandOutput {
    pub(crate) stdout: String,
}

/// Runs a command to completion, failing on a non-zero exit status.
pub(crate) fn run_captured(command: &mut Command, context_message: &str) -> Result<CommandOutput> {
    let rendered = describe_command(command);
    tracing::debug!(command = %rendered, "running external command");
    let output = command
        .output()
        .with_context(|| format!("{context_message}: failed to launch `{rendered}`"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if output.status.success() {
        if !stderr.trim().is_empty() {
            tracing::debug!(
                command = %rendered,
                stderr = %stderr.trim(),
                "command succeeded with stderr output"
            );
        }
        return Ok(CommandOutput { stdout });
    }

    Err(anyhow!(
        "{context_message}: `{rendered}` exited with {} stderr='{}'",
        output.status,
        stderr.trim()
    ))
}

pub(crate) fn describe_command(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(
        command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned()),
    );
    parts.join(" ")
}
