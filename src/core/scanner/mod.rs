// src/core/scanner/mod.rs

// This file acts as the public interface for the `scanner` module.
// It declares the individual probes and the orchestrator that merges them.
pub mod banner_scanner;
pub mod exif_scanner;
pub mod page_scanner;
pub mod ssl_scanner;

use crate::core::context::ScanContext;
use crate::core::directory::AuthorityDirectoryClient;
use crate::core::extractors;
use crate::core::html::{PageParser, ScraperParser};
use crate::core::image_meta::{ExifDecoder, ImageDecoder};
use crate::core::models::{
    BannerResult, CertInfo, DirectoryDescriptor, ExposedFile, ImageExif, Page, ProbeOutcome, ScanReport,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// The network-touching probes run against one target. Every method is total:
/// failures come back as payloads, never as panics or propagated errors.
#[async_trait]
pub trait Probes: Send + Sync {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> ProbeOutcome<Page>;

    async fn check_common_paths(&self, url: &str, timeout: Duration) -> Vec<ExposedFile>;

    async fn extract_image_metadata(&self, html: &str, base_url: &str, timeout: Duration) -> Vec<ImageExif>;

    async fn read_certificate(&self, host: &str, timeout: Duration) -> CertInfo;

    async fn scan_protocols(&self, host: &str, timeout: Duration) -> BTreeMap<String, BannerResult>;

    async fn directory_descriptor(&self) -> DirectoryDescriptor;
}

/// Probes backed by the context's shared proxy transport.
pub struct LiveProbes {
    ctx: Arc<ScanContext>,
    parser: Arc<dyn PageParser>,
    decoder: Arc<dyn ImageDecoder>,
}

impl LiveProbes {
    pub fn new(ctx: Arc<ScanContext>, parser: Arc<dyn PageParser>, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self { ctx, parser, decoder }
    }
}

#[async_trait]
impl Probes for LiveProbes {
    async fn fetch_page(&self, url: &str, timeout: Duration) -> ProbeOutcome<Page> {
        let transport = self.ctx.transport().map_err(|e| e.to_string())?;
        page_scanner::fetch_page(transport.as_ref(), url, timeout).await
    }

    async fn check_common_paths(&self, url: &str, timeout: Duration) -> Vec<ExposedFile> {
        match self.ctx.transport() {
            Ok(transport) => page_scanner::check_common_paths(transport.as_ref(), url, timeout).await,
            Err(e) => {
                warn!(error = %e, "No transport for common path check.");
                Vec::new()
            }
        }
    }

    async fn extract_image_metadata(&self, html: &str, base_url: &str, timeout: Duration) -> Vec<ImageExif> {
        match self.ctx.transport() {
            Ok(transport) => {
                exif_scanner::extract_image_metadata(
                    transport.as_ref(),
                    self.parser.as_ref(),
                    self.decoder.as_ref(),
                    html,
                    base_url,
                    timeout,
                )
                .await
            }
            Err(e) => {
                warn!(error = %e, "No transport for image metadata extraction.");
                Vec::new()
            }
        }
    }

    async fn read_certificate(&self, host: &str, timeout: Duration) -> CertInfo {
        match self.ctx.transport() {
            Ok(transport) => ssl_scanner::read_certificate(transport.as_ref(), host, timeout).await,
            Err(e) => CertInfo::Failed { error: e.to_string() },
        }
    }

    async fn scan_protocols(&self, host: &str, timeout: Duration) -> BTreeMap<String, BannerResult> {
        match self.ctx.transport() {
            Ok(transport) => banner_scanner::scan_protocol_suite(transport.as_ref(), host, timeout).await,
            Err(e) => banner_scanner::Protocol::iter_keys()
                .map(|key| (key, BannerResult::failed(e.to_string())))
                .collect(),
        }
    }

    async fn directory_descriptor(&self) -> DirectoryDescriptor {
        let transport = match self.ctx.transport() {
            Ok(t) => t,
            Err(e) => return DirectoryDescriptor::Failed { error: e.to_string() },
        };
        let config = self.ctx.config();
        let client = AuthorityDirectoryClient::new(
            transport,
            config.directory_authorities.clone(),
            config.directory_timeout,
        );
        self.ctx.descriptors().get_or_fetch(&client).await
    }
}

/// Runs every probe for a target and merges the outcomes into one report.
pub struct Scanner {
    probes: Arc<dyn Probes>,
    parser: Arc<dyn PageParser>,
    timeout: Duration,
    image_timeout: Duration,
}

impl Scanner {
    pub fn new(probes: Arc<dyn Probes>, parser: Arc<dyn PageParser>, timeout: Duration, image_timeout: Duration) -> Self {
        Self { probes, parser, timeout, image_timeout }
    }

    /// Wires live probes, the `scraper` parser and the EXIF decoder to a context.
    pub fn live(ctx: Arc<ScanContext>) -> Self {
        let parser: Arc<dyn PageParser> = Arc::new(ScraperParser);
        let decoder: Arc<dyn ImageDecoder> = Arc::new(ExifDecoder);
        let (timeout, image_timeout) = (ctx.config().timeout, ctx.config().image_timeout);
        let probes = Arc::new(LiveProbes::new(ctx, Arc::clone(&parser), decoder));
        Self::new(probes, parser, timeout, image_timeout)
    }

    /// Scans one target.
    ///
    /// The page fetch is the only fatal step: when it fails the reason is
    /// recorded and the report is returned with every other field at its
    /// default. Otherwise the content extractors run on the page and all network
    /// probes run concurrently.
    pub async fn scan_service(&self, url: &str) -> ScanReport {
        info!(url, "Scanning target.");
        let mut report = ScanReport::new(url);

        let page = match self.probes.fetch_page(url, self.timeout).await {
            Ok(page) => page,
            Err(reason) => {
                warn!(url, %reason, "Page fetch failed, skipping remaining probes.");
                report.errors.push(reason);
                return report;
            }
        };

        report.metadata = extractors::extract_metadata(&page.headers);
        report.linked_onions = extractors::extract_onion_links(self.parser.as_ref(), &page.html);
        report.bitcoin_addresses = extractors::extract_bitcoin_addresses(&page.html);
        report.pgp_keys = extractors::extract_pgp_keys(&page.html);
        report.emails_and_ids = extractors::extract_emails_and_ids(&page.html);
        report.html_sha1 = extractors::html_fingerprint(&page.body);

        let host = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().map(str::to_string),
            Err(e) => {
                report.errors.push(format!("Protocol scan error: {e}"));
                None
            }
        };

        let host_probes = async {
            match host.as_deref() {
                Some(host) => {
                    let (cert, protocols) = tokio::join!(
                        self.probes.read_certificate(host, self.timeout),
                        self.probes.scan_protocols(host, self.timeout)
                    );
                    Some((cert, protocols))
                }
                None => None,
            }
        };

        let (exposed_files, exif_data, tor_descriptor, host_results) = tokio::join!(
            self.probes.check_common_paths(url, self.timeout),
            self.probes.extract_image_metadata(&page.html, url, self.image_timeout),
            self.probes.directory_descriptor(),
            host_probes
        );

        report.exposed_files = exposed_files;
        report.exif_data = exif_data;
        report.tor_descriptor = tor_descriptor;
        if let Some((cert_info, protocols)) = host_results {
            report.cert_info = cert_info;
            report.protocols = protocols;
        }

        info!(url, errors = report.errors.len(), "Target scan finished.");
        report
    }
}
