// src/error.rs

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised inside a probe before it is collapsed into a report payload.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The remote end (or the proxy on its behalf) actively refused the connection.
    #[error("connection refused")]
    Refused,

    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("proxy {addr} unreachable: {source}")]
    ProxyUnavailable {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("SOCKS5 error: {0}")]
    Socks(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("directory lookup failed: {0}")]
    Directory(String),

    #[error("transport setup failed: {0}")]
    Setup(String),
}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => ProbeError::Refused,
            _ => ProbeError::Io(e),
        }
    }
}

/// Failures of the image capability. All of them are suppressed by the image probe.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized image format")]
    UnrecognizedFormat,

    #[error("metadata read failed: {0}")]
    Metadata(String),
}

/// Run-level failures: reading a target list or writing the report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_io_error_maps_to_refused() {
        let err: ProbeError = io::Error::from(io::ErrorKind::ConnectionRefused).into();
        assert!(matches!(err, ProbeError::Refused));

        let err: ProbeError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, ProbeError::Io(_)));
    }

    #[test]
    fn timeout_message_is_readable() {
        let err = ProbeError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "timed out after 10s");
    }
}
