// src/core/transport.rs

use crate::core::config::{ProxyConfig, USER_AGENT};
use crate::core::models::HeaderList;
use crate::core::socks;
use crate::error::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

/// A fully read HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The single channel every network-touching probe goes through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProbeError>;

    /// Opens a raw TCP stream to `host:port`, already tunneled through the proxy.
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ProbeError>;
}

/// HTTP and raw TCP over a SOCKS5 proxy.
pub struct ProxyTransport {
    config: ProxyConfig,
    client: reqwest::Client,
}

impl ProxyTransport {
    pub fn new(config: ProxyConfig, accept_invalid_certs: bool) -> Result<Self, ProbeError> {
        info!(proxy = %config.addr(), "Building proxied transport.");
        let proxy = reqwest::Proxy::all(config.socks_url()).map_err(|e| {
            error!(error = %e, "Invalid proxy URL");
            ProbeError::Setup(format!("invalid proxy URL: {e}"))
        })?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client");
                ProbeError::Setup(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProbeError> {
        debug!(url, "Sending proxied GET.");
        let response = self.client.get(url).timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or_else(|_| {
                    warn!(header_name = %name, "Header contained invalid UTF-8.");
                    "[Invalid UTF-8]"
                });
                (name.as_str().to_string(), value.to_string())
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(url, status, bytes = body.len(), "Received proxied response.");
        Ok(HttpResponse { status, headers, body })
    }

    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ProbeError> {
        tokio::time::timeout(timeout, socks::connect(&self.config, host, port))
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
    }
}
