use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

const REMOTE_UPDATE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Default, Deserialize)]
struct RemoteUpdateBody {
    status: Option<String>,
    error: Option<String>,
}

/// Asks the remote sync endpoint to run an update and returns its status.
pub(crate) fn trigger_remote_update(endpoint: &str, token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("remote update token must not be empty");
    }
    let endpoint = normalise_endpoint(endpoint)?;

    let client = Client::builder()
        .timeout(REMOTE_UPDATE_TIMEOUT)
        .build()
        .context("failed to build http client")?;
    let response = client
        .post(&endpoint)
        .bearer_auth(token)
        .send()
        .with_context(|| format!("remote update request to {endpoint} failed"))?;
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("failed reading remote update response from {endpoint}"))?;

    interpret_remote_response(&endpoint, status.as_u16(), &body)
}

pub(crate) fn interpret_remote_response(endpoint: &str, code: u16, body: &str) -> Result<String> {
    let parsed = serde_json::from_str::<RemoteUpdateBody>(body).unwrap_or_default();
    if (200..300).contains(&code) {
        return Ok(parsed.status.unwrap_or_else(|| "success".to_string()));
    }

    let detail = parsed
        .error
        .or(parsed.status)
        .unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        anyhow::bail!("remote update rejected by {endpoint}: http {code}");
    }
    anyhow::bail!("remote update rejected by {endpoint}: http {code}: {detail}")
}

pub(crate) fn normalise_endpoint(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("remote update endpoint must not be empty");
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    Ok(with_scheme.trim_end_matches('/').to_string())
}
