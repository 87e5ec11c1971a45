//! Orchestrator and report assembly tests with every probe stubbed out.

use async_trait::async_trait;
use onion_scout::core::html::ScraperParser;
use onion_scout::core::models::{
    BannerResult, CertInfo, CertificateInfo, DirectoryDescriptor, ExposedFile, ImageExif, Page, ProbeOutcome,
    RelayDescriptor, ScanReport,
};
use onion_scout::core::report::run_scan;
use onion_scout::core::scanner::{Probes, Scanner};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct StubProbes {
    fail_fetch_for: Option<&'static str>,
    host_calls: AtomicUsize,
}

impl StubProbes {
    fn new() -> Self {
        Self { fail_fetch_for: None, host_calls: AtomicUsize::new(0) }
    }

    fn failing_on(url: &'static str) -> Self {
        Self { fail_fetch_for: Some(url), host_calls: AtomicUsize::new(0) }
    }
}

fn stub_cert() -> CertInfo {
    CertInfo::Certificate(CertificateInfo {
        subject: "CN=abc.onion".into(),
        issuer: "CN=abc.onion".into(),
        not_before: "Jan  1 00:00:00 2024 GMT".into(),
        not_after: "Jan  1 00:00:00 2034 GMT".into(),
    })
}

fn stub_descriptor() -> DirectoryDescriptor {
    DirectoryDescriptor::Relay(RelayDescriptor {
        nickname: "test".into(),
        published: "2024-05-01 10:20:30".into(),
        platform: None,
        contact: None,
    })
}

#[async_trait]
impl Probes for StubProbes {
    async fn fetch_page(&self, url: &str, _timeout: Duration) -> ProbeOutcome<Page> {
        if self.fail_fetch_for == Some(url) {
            return Err("boom".to_string());
        }
        let html = r#"<html><a href="http://linked.onion/">x</a> contact admin@abc.onion UA-1234-5</html>"#;
        Ok(Page {
            html: html.into(),
            headers: vec![("Server".into(), "Apache".into()), ("Content-Type".into(), "text/html".into())],
            body: html.as_bytes().to_vec(),
        })
    }

    async fn check_common_paths(&self, _url: &str, _timeout: Duration) -> Vec<ExposedFile> {
        vec![ExposedFile { path: "/admin".into(), status: 200 }]
    }

    async fn extract_image_metadata(&self, _html: &str, _base_url: &str, _timeout: Duration) -> Vec<ImageExif> {
        Vec::new()
    }

    async fn read_certificate(&self, _host: &str, _timeout: Duration) -> CertInfo {
        self.host_calls.fetch_add(1, Ordering::SeqCst);
        stub_cert()
    }

    async fn scan_protocols(&self, _host: &str, _timeout: Duration) -> BTreeMap<String, BannerResult> {
        self.host_calls.fetch_add(1, Ordering::SeqCst);
        BTreeMap::from([("ssh_info".to_string(), BannerResult::banner("ssh", "OpenSSH"))])
    }

    async fn directory_descriptor(&self) -> DirectoryDescriptor {
        stub_descriptor()
    }
}

fn scanner(probes: Arc<StubProbes>) -> Scanner {
    Scanner::new(probes, Arc::new(ScraperParser), Duration::from_secs(10), Duration::from_secs(5))
}

#[tokio::test]
async fn scan_service_merges_probe_outputs_unchanged() {
    let report = scanner(Arc::new(StubProbes::new())).scan_service("http://abc.onion").await;

    assert_eq!(report.url, "http://abc.onion");
    assert!(report.errors.is_empty());
    assert_eq!(report.metadata, BTreeMap::from([("Server".to_string(), "Apache".to_string())]));
    assert_eq!(report.exposed_files, vec![ExposedFile { path: "/admin".into(), status: 200 }]);
    assert_eq!(report.cert_info, stub_cert());
    assert_eq!(report.protocols["ssh_info"], BannerResult::banner("ssh", "OpenSSH"));
    assert_eq!(report.tor_descriptor, stub_descriptor());
    assert_eq!(report.linked_onions, vec!["http://linked.onion/"]);
    assert_eq!(report.emails_and_ids.emails, vec!["admin@abc.onion"]);
    assert_eq!(report.emails_and_ids.google_analytics_ids, vec!["UA-1234-5"]);
    assert_eq!(report.html_sha1.len(), 40);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["ssh_info"], serde_json::json!({"ssh_banner": "OpenSSH"}));
    assert_eq!(json["tor_descriptor"]["nickname"], "test");
}

#[tokio::test]
async fn fetch_failure_short_circuits_with_defaults() {
    let probes = Arc::new(StubProbes::failing_on("http://abc.onion"));
    let report = scanner(Arc::clone(&probes)).scan_service("http://abc.onion").await;

    let expected = ScanReport { errors: vec!["boom".to_string()], ..ScanReport::new("http://abc.onion") };
    assert_eq!(report, expected);
    assert_eq!(probes.host_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_failing_target_does_not_abort_the_run() {
    let probes = Arc::new(StubProbes::failing_on("http://down.onion"));
    let scanner = scanner(probes);
    let targets = vec!["http://down.onion".to_string(), "http://up.onion".to_string()];

    for concurrency in [1, 4] {
        let results = run_scan(&scanner, &targets, concurrency).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["http://down.onion"].errors, vec!["boom"]);
        assert!(results["http://up.onion"].errors.is_empty());
        assert_eq!(results["http://up.onion"].cert_info, stub_cert());
    }
}

#[tokio::test]
async fn url_without_host_skips_host_probes() {
    let probes = Arc::new(StubProbes::new());
    let report = scanner(Arc::clone(&probes)).scan_service("data:text/html,hello").await;

    assert!(report.errors.is_empty());
    assert_eq!(report.cert_info, CertInfo::default());
    assert!(report.protocols.is_empty());
    assert_eq!(probes.host_calls.load(Ordering::SeqCst), 0);
}
