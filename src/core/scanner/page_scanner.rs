// src/core/scanner/page_scanner.rs

use crate::core::models::{ExposedFile, Page, ProbeOutcome};
use crate::core::transport::Transport;
use crate::error::ProbeError;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Well-known paths that should never be reachable on a hidden service.
pub const COMMON_PATHS: &[&str] = &["/robots.txt", "/.git/HEAD", "/.env", "/admin", "/config.php", "/server-status"];

/// Fetches the target page. An empty body counts as a failure, since nothing
/// downstream can run without content.
pub async fn fetch_page(transport: &dyn Transport, url: &str, timeout: Duration) -> ProbeOutcome<Page> {
    info!(url, "Fetching page.");
    match transport.get(url, timeout).await {
        Ok(response) => {
            if response.body.is_empty() {
                error!(url, status = response.status, "Page fetch returned an empty body.");
                return Err(format!("Empty response body from {url} (HTTP {})", response.status));
            }
            info!(status = response.status, bytes = response.body.len(), "Page fetched.");
            Ok(Page { html: response.text(), headers: response.headers, body: response.body })
        }
        Err(e) => {
            error!(url, error = %e, "Page fetch failed.");
            Err(e.to_string())
        }
    }
}

/// `scheme://host[:port]` of a target URL.
pub fn base_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

/// Requests each of [`COMMON_PATHS`] under the target's origin and reports those
/// answering 200. A failed request only drops its own path.
pub async fn check_common_paths(transport: &dyn Transport, url: &str, timeout: Duration) -> Vec<ExposedFile> {
    let Some(base) = base_url(url) else {
        debug!(url, "No origin to probe for common paths.");
        return Vec::new();
    };
    info!(base = %base, "Checking common paths.");

    let checks = COMMON_PATHS.iter().map(|path| probe_path(transport, &base, path, timeout));
    let findings: Vec<ExposedFile> = join_all(checks)
        .await
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, "Path check failed, skipping.");
                None
            }
        })
        .collect();

    info!(count = findings.len(), "Common path check finished.");
    findings
}

async fn probe_path(
    transport: &dyn Transport,
    base: &str,
    path: &str,
    timeout: Duration,
) -> Result<Option<ExposedFile>, ProbeError> {
    let response = transport.get(&format!("{base}{path}"), timeout).await?;
    debug!(path, status = response.status, "Path checked.");
    Ok((response.status == 200).then(|| ExposedFile { path: path.to_string(), status: response.status }))
}
