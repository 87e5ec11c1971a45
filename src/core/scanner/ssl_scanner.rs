// src/core/scanner/ssl_scanner.rs

use tracing::{debug, error, info};

use crate::core::models::{CertInfo, CertificateInfo};
use crate::core::transport::Transport;
use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use std::time::Duration;
use x509_parser::prelude::*;

const TLS_PORT: u16 = 443;

/// Reads the certificate the host presents on port 443.
///
/// Neither the hostname nor the trust chain is verified: hidden services
/// routinely use self-signed certificates and that is exactly what we want to
/// see.
pub async fn read_certificate(transport: &dyn Transport, host: &str, timeout: Duration) -> CertInfo {
    info!(host, "Starting TLS certificate scan.");

    let outcome = match tokio::time::timeout(timeout, perform_tls_scan(transport, host, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    };

    match outcome {
        Ok(info) => {
            info!(subject = %info.subject, "TLS certificate scan finished.");
            CertInfo::Certificate(info)
        }
        Err(e) => {
            error!(host, error = %e, "TLS certificate scan failed.");
            CertInfo::Failed { error: e.to_string() }
        }
    }
}

async fn perform_tls_scan(transport: &dyn Transport, host: &str, timeout: Duration) -> Result<CertificateInfo, ProbeError> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    debug!(host, port = TLS_PORT, "Connecting through proxy.");
    let stream = transport.connect(host, TLS_PORT, timeout).await?;

    debug!(host, "Performing TLS handshake.");
    let stream = connector.connect(host, stream).await?;

    let cert = stream
        .get_ref()
        .peer_certificate()?
        .ok_or_else(|| ProbeError::Certificate("server did not present a certificate".into()))?;
    let der = cert.to_der()?;
    certificate_info(&der)
}

/// Extracts subject, issuer and validity bounds from a DER certificate.
pub fn certificate_info(der: &[u8]) -> Result<CertificateInfo, ProbeError> {
    let (_, x509) = parse_x509_certificate(der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        ProbeError::Certificate(format!("X.509 parse error: {e}"))
    })?;

    let validity = x509.validity();
    Ok(CertificateInfo {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        not_before: format_asn1_time(&validity.not_before),
        not_after: format_asn1_time(&validity.not_after),
    })
}

/// Formats as `Mon DD HH:MM:SS YYYY GMT`, the layout OpenSSL prints.
fn format_asn1_time(time: &ASN1Time) -> String {
    let utc: DateTime<Utc> = DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default();
    utc.format("%b %e %H:%M:%S %Y GMT").to_string()
}
