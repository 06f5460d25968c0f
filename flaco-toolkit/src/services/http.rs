//! HTTP(S) status probe.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use log::debug;
use reqwest::Client;
use url::Url;

use crate::error::{ProbeError, ProbeResult};

/// Shared HTTP client; the timeout is applied per request.
static HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(concat!("flaco/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
});

/// Validate `url` as an absolute http/https URL.
pub(crate) fn parse_url(url: &str) -> ProbeResult<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| ProbeError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ProbeError::InvalidUrl(format!(
            "{url}: unsupported scheme '{other}'"
        ))),
    }
}

/// Issue a single GET against `url` and return the status code.
///
/// Any response counts as success, including 4xx and 5xx. Only failures to
/// obtain a response at all are errors.
pub async fn probe_url(url: &str, request_timeout: Duration) -> ProbeResult<u16> {
    let parsed = parse_url(url)?;
    debug!("[HTTP] GET {parsed}");
    let start = Instant::now();

    let response = HTTP_CLIENT
        .get(parsed.clone())
        .timeout(request_timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(format!(
                    "GET {parsed} timed out ({}s)",
                    request_timeout.as_secs()
                ))
            } else {
                ProbeError::HttpError(format!("GET {parsed} failed: {e}"))
            }
        })?;

    let status_code = response.status().as_u16();
    debug!(
        "[HTTP] GET {parsed} -> {status_code} in {:?}",
        start.elapsed()
    );
    Ok(status_code)
}
