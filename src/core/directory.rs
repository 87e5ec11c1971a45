// src/core/directory.rs

//! Relay descriptor lookup and the memoized cell that keeps its result.

use crate::core::models::{DirectoryDescriptor, RelayDescriptor};
use crate::core::transport::Transport;
use crate::error::ProbeError;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SERVER_DESCRIPTORS_PATH: &str = "/tor/server/all";
const PUBLISHED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of relay server descriptors.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn server_descriptors(&self) -> Result<Vec<RelayDescriptor>, ProbeError>;
}

/// Downloads server descriptors from directory authorities through the proxy transport.
pub struct AuthorityDirectoryClient {
    transport: Arc<dyn Transport>,
    authorities: Vec<String>,
    timeout: Duration,
}

impl AuthorityDirectoryClient {
    pub fn new(transport: Arc<dyn Transport>, authorities: Vec<String>, timeout: Duration) -> Self {
        Self { transport, authorities, timeout }
    }
}

#[async_trait]
impl DirectoryClient for AuthorityDirectoryClient {
    async fn server_descriptors(&self) -> Result<Vec<RelayDescriptor>, ProbeError> {
        let mut last_error = None;
        for authority in &self.authorities {
            let url = format!("http://{authority}{SERVER_DESCRIPTORS_PATH}");
            debug!(%url, "Querying directory authority.");
            match self.transport.get(&url, self.timeout).await {
                Ok(response) if response.status == 200 => {
                    let descriptors = parse_server_descriptors(&response.text());
                    info!(authority = %authority, count = descriptors.len(), "Fetched relay descriptors.");
                    return Ok(descriptors);
                }
                Ok(response) => {
                    warn!(authority = %authority, status = response.status, "Directory authority refused the query.");
                    last_error = Some(ProbeError::Directory(format!(
                        "{authority} answered with HTTP {}",
                        response.status
                    )));
                }
                Err(e) => {
                    warn!(authority = %authority, error = %e, "Directory authority unreachable.");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ProbeError::Directory("no directory authorities configured".into())))
    }
}

/// Parses a concatenation of server descriptors. Each descriptor starts at a
/// `router` line; descriptors without a nickname or publication date are dropped.
pub fn parse_server_descriptors(document: &str) -> Vec<RelayDescriptor> {
    let mut descriptors = Vec::new();
    let mut current: Option<PartialDescriptor> = None;

    for line in document.lines() {
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        match keyword {
            "router" => {
                if let Some(done) = current.take().and_then(PartialDescriptor::finish) {
                    descriptors.push(done);
                }
                current = Some(PartialDescriptor {
                    nickname: rest.split_whitespace().next().map(str::to_string),
                    ..Default::default()
                });
            }
            "published" => {
                if let Some(d) = current.as_mut() {
                    d.published = NaiveDateTime::parse_from_str(rest.trim(), PUBLISHED_FORMAT)
                        .ok()
                        .map(|t| t.format(PUBLISHED_FORMAT).to_string());
                }
            }
            "platform" => {
                if let Some(d) = current.as_mut() {
                    d.platform = Some(rest.trim().to_string());
                }
            }
            "contact" => {
                if let Some(d) = current.as_mut() {
                    d.contact = Some(rest.trim().to_string());
                }
            }
            _ => {}
        }
    }

    if let Some(done) = current.and_then(PartialDescriptor::finish) {
        descriptors.push(done);
    }
    descriptors
}

#[derive(Default)]
struct PartialDescriptor {
    nickname: Option<String>,
    published: Option<String>,
    platform: Option<String>,
    contact: Option<String>,
}

impl PartialDescriptor {
    fn finish(self) -> Option<RelayDescriptor> {
        Some(RelayDescriptor {
            nickname: self.nickname?,
            published: self.published?,
            platform: self.platform,
            contact: self.contact,
        })
    }
}

struct CachedDescriptor {
    result: DirectoryDescriptor,
    stored_at: Instant,
}

/// Single-slot memoized result of the directory lookup.
///
/// The lock is held while the query is in flight, so concurrent callers wait
/// for and share one query. A success is kept until [`DescriptorCache::clear`];
/// a failure is kept for `failure_ttl` and then queried again.
pub struct DescriptorCache {
    slot: Mutex<Option<CachedDescriptor>>,
    failure_ttl: Duration,
}

impl DescriptorCache {
    pub fn new(failure_ttl: Duration) -> Self {
        Self { slot: Mutex::new(None), failure_ttl }
    }

    pub async fn get_or_fetch(&self, client: &dyn DirectoryClient) -> DirectoryDescriptor {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            let expired = cached.result.is_error() && cached.stored_at.elapsed() >= self.failure_ttl;
            if !expired {
                debug!("Serving cached directory descriptor.");
                return cached.result.clone();
            }
            debug!("Cached directory failure expired, querying again.");
        }

        let result = fetch_first_descriptor(client).await;
        *slot = Some(CachedDescriptor { result: result.clone(), stored_at: Instant::now() });
        result
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

async fn fetch_first_descriptor(client: &dyn DirectoryClient) -> DirectoryDescriptor {
    match client.server_descriptors().await {
        Ok(descriptors) => match descriptors.into_iter().next() {
            Some(first) => {
                info!(nickname = %first.nickname, "Directory descriptor resolved.");
                DirectoryDescriptor::Relay(first)
            }
            None => {
                warn!("Directory returned no descriptors.");
                DirectoryDescriptor::Failed { error: "No relay descriptors available".to_string() }
            }
        },
        Err(e) => {
            warn!(error = %e, "Directory lookup failed.");
            DirectoryDescriptor::Failed { error: e.to_string() }
        }
    }
}
