// src/core/config.rs

use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";
pub const DEFAULT_PROXY_PORT: u16 = 9050;
pub const PROXY_HOST_ENV: &str = "TOR_PROXY_HOST";
pub const PROXY_PORT_ENV: &str = "TOR_PROXY_PORT";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_DESCRIPTOR_FAILURE_TTL: Duration = Duration::from_secs(300);

/// Browser-like user agent sent with every proxied HTTP request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Directory authorities (address:DirPort) queried for relay descriptors, in order.
pub const DIRECTORY_AUTHORITIES: &[&str] = &[
    "128.31.0.34:9231",
    "217.196.147.77:80",
    "45.66.35.11:80",
    "131.188.40.189:80",
    "193.23.244.244:80",
    "171.25.193.9:443",
    "199.58.81.140:80",
];

/// Address of the SOCKS proxy every probe egresses through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { host: DEFAULT_PROXY_HOST.to_string(), port: DEFAULT_PROXY_PORT }
    }
}

/// Values given explicitly on the command line. They win over the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyOverride {
    pub host: Option<String>,
    pub port: Option<String>,
}

impl ProxyConfig {
    /// Resolves the proxy address from the CLI override, then the process
    /// environment, then the defaults.
    pub fn resolve(cli: &ProxyOverride) -> Self {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Same precedence as [`ProxyConfig::resolve`] with a caller-supplied
    /// environment lookup. A port that is not a number in `1..=65535` counts as absent.
    pub fn resolve_with<F>(cli: &ProxyOverride, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = non_empty(cli.host.clone())
            .or_else(|| non_empty(lookup(PROXY_HOST_ENV)))
            .unwrap_or_else(|| DEFAULT_PROXY_HOST.to_string());

        let port = cli
            .port
            .as_deref()
            .and_then(parse_port)
            .or_else(|| lookup(PROXY_PORT_ENV).as_deref().and_then(parse_port))
            .unwrap_or(DEFAULT_PROXY_PORT);

        debug!(%host, port, "Resolved proxy configuration.");
        Self { host, port }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Proxy URL for HTTP clients. `socks5h` keeps name resolution on the proxy side.
    pub fn socks_url(&self) -> String {
        format!("socks5h://{}", self.addr())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_port(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u16>().ok().filter(|p| *p != 0)
}

/// Knobs shared by every scan run from one context.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Per-call timeout for the page fetch, path checks, certificate and banner probes.
    pub timeout: Duration,
    /// Per-image timeout for the image metadata probe.
    pub image_timeout: Duration,
    pub directory_timeout: Duration,
    /// How long a failed directory lookup stays cached before it is queried again.
    pub descriptor_failure_ttl: Duration,
    pub directory_authorities: Vec<String>,
    /// Number of targets scanned at the same time.
    pub concurrency: usize,
    /// Accept self-signed or mismatched certificates on HTTPS page fetches.
    pub accept_invalid_certs: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            directory_timeout: DEFAULT_DIRECTORY_TIMEOUT,
            descriptor_failure_ttl: DEFAULT_DESCRIPTOR_FAILURE_TTL,
            directory_authorities: DIRECTORY_AUTHORITIES.iter().map(|a| a.to_string()).collect(),
            concurrency: 1,
            accept_invalid_certs: false,
        }
    }
}
