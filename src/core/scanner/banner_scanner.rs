// src/core/scanner/banner_scanner.rs

use crate::core::models::BannerResult;
use crate::core::transport::Transport;
use crate::error::ProbeError;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::time::Duration;
use strum::{EnumIter, IntoEnumIterator};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

const BANNER_LEN: usize = 1024;

/// Services whose banners are collected from every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Ssh,
    Ftp,
    Smtp,
    Xmpp,
    Bitcoin,
    Irc,
    Vnc,
    Mongodb,
}

impl Protocol {
    pub fn port(self) -> u16 {
        match self {
            Protocol::Ssh => 22,
            Protocol::Ftp => 21,
            Protocol::Smtp => 25,
            Protocol::Xmpp => 5222,
            Protocol::Bitcoin => 8333,
            Protocol::Irc => 6667,
            Protocol::Vnc => 5900,
            Protocol::Mongodb => 27017,
        }
    }

    /// Key of this protocol's entry in the report.
    pub fn report_key(self) -> String {
        format!("{self}_info")
    }

    pub fn iter_keys() -> impl Iterator<Item = String> {
        Protocol::iter().map(Protocol::report_key)
    }
}

/// Connects to `host:port` and reads whatever the service says first. The
/// tunnel setup and the read share one `timeout`.
pub async fn scan_banner(transport: &dyn Transport, host: &str, port: u16, label: &str, timeout: Duration) -> BannerResult {
    debug!(host, port, label, "Grabbing banner.");
    let outcome = match tokio::time::timeout(timeout, grab(transport, host, port, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    };
    match outcome {
        Ok(banner) => {
            info!(port, label, bytes = banner.len(), "Banner received.");
            BannerResult::banner(label, banner)
        }
        Err(ProbeError::Refused) => {
            debug!(port, label, "Port closed.");
            BannerResult::closed()
        }
        Err(e) => {
            warn!(port, label, error = %e, "Banner grab failed.");
            BannerResult::failed(e.to_string())
        }
    }
}

async fn grab(transport: &dyn Transport, host: &str, port: u16, timeout: Duration) -> Result<String, ProbeError> {
    let mut stream = transport.connect(host, port, timeout).await?;
    let mut buf = vec![0u8; BANNER_LEN];
    let n = stream.read(&mut buf).await?;
    Ok(decode_banner(&buf[..n]))
}

/// Decodes as UTF-8, dropping invalid sequences, and trims surrounding whitespace.
pub fn decode_banner(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, "").trim().to_string()
}

/// Runs [`scan_banner`] for every [`Protocol`], each captured independently.
pub async fn scan_protocol_suite(
    transport: &dyn Transport,
    host: &str,
    timeout: Duration,
) -> BTreeMap<String, BannerResult> {
    info!(host, "Starting protocol banner suite.");
    let scans = Protocol::iter().map(|protocol| async move {
        let result = scan_banner(transport, host, protocol.port(), protocol.as_ref(), timeout).await;
        (protocol.report_key(), result)
    });
    let results: BTreeMap<_, _> = join_all(scans).await.into_iter().collect();
    info!(host, scanned = results.len(), "Protocol banner suite finished.");
    results
}
