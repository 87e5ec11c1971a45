// src/core/models.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Reusable Result Types ---

/// A probe outcome that either carries its payload or a human readable error.
pub type ProbeOutcome<T> = Result<T, String>;

/// Response headers in the order the server sent them.
pub type HeaderList = Vec<(String, String)>;

// --- Page Fetch ---

/// The landing page of a target, as returned by the page fetch probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub html: String,
    pub headers: HeaderList,
    /// Raw body bytes; `html` is their lossy UTF-8 decoding.
    pub body: Vec<u8>,
}

// --- Common Paths ---

// A well-known path that answered with HTTP 200.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExposedFile {
    pub path: String,
    pub status: u16,
}

// --- TLS Certificate ---

/// Details read from the peer certificate presented on port 443.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    #[serde(rename = "notBefore")]
    pub not_before: String,
    #[serde(rename = "notAfter")]
    pub not_after: String,
}

/// Serialized as the certificate fields, `{"error": ...}`, or `{}` when the probe never ran.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CertInfo {
    Certificate(CertificateInfo),
    Failed { error: String },
    NotScanned {},
}

impl Default for CertInfo {
    fn default() -> Self {
        CertInfo::NotScanned {}
    }
}

// --- Service Banners ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Closed,
}

/// Outcome of a single banner grab.
///
/// `Closed` is reserved for connections the target actively refused; timeouts
/// and every other I/O failure land in `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BannerResult {
    Closed { status: PortStatus },
    Failed { error: String },
    Banner(BTreeMap<String, String>),
}

impl BannerResult {
    pub fn banner(label: &str, text: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(format!("{label}_banner"), text.into());
        BannerResult::Banner(map)
    }

    pub fn closed() -> Self {
        BannerResult::Closed { status: PortStatus::Closed }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        BannerResult::Failed { error: error.into() }
    }
}

// --- Content Extraction ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailsAndIds {
    pub emails: Vec<String>,
    pub google_analytics_ids: Vec<String>,
}

// --- Image Metadata ---

/// A raw tag value as produced by an image decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A tag value as it appears in the report. Binary values are already hex encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExifValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<TagValue> for ExifValue {
    fn from(value: TagValue) -> Self {
        match value {
            TagValue::Int(i) => ExifValue::Int(i),
            TagValue::Float(f) => ExifValue::Float(f),
            TagValue::Text(s) => ExifValue::Text(s),
            TagValue::Bytes(b) => ExifValue::Text(hex::encode(b)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageExif {
    pub src: String,
    pub exif: BTreeMap<u16, ExifValue>,
}

// --- Directory Descriptor ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayDescriptor {
    pub nickname: String,
    pub published: String,
    pub platform: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DirectoryDescriptor {
    Relay(RelayDescriptor),
    Failed { error: String },
    NotFetched {},
}

impl Default for DirectoryDescriptor {
    fn default() -> Self {
        DirectoryDescriptor::NotFetched {}
    }
}

impl DirectoryDescriptor {
    pub fn is_error(&self) -> bool {
        matches!(self, DirectoryDescriptor::Failed { .. })
    }
}

// --- Main Report ---

/// Everything learned about one target. Every field has an empty default so the
/// serialized shape does not depend on which probes succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScanReport {
    pub url: String,
    pub errors: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub linked_onions: Vec<String>,
    pub cert_info: CertInfo,
    pub exposed_files: Vec<ExposedFile>,
    pub bitcoin_addresses: Vec<String>,
    pub pgp_keys: Vec<String>,
    pub emails_and_ids: EmailsAndIds,
    pub exif_data: Vec<ImageExif>,
    pub html_sha1: String,
    pub tor_descriptor: DirectoryDescriptor,
    /// `{label}_info` entries from the protocol banner suite.
    #[serde(flatten)]
    pub protocols: BTreeMap<String, BannerResult>,
}

impl ScanReport {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string(), ..Default::default() }
    }
}

/// Reports keyed by target URL.
pub type ScanResults = BTreeMap<String, ScanReport>;
