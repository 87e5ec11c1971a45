// src/core/extractors.rs

//! Pure text extractors run against a fetched page.

use crate::core::html::PageParser;
use crate::core::models::{EmailsAndIds, HeaderList};
use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, HashSet};

/// Response headers that leak server software.
const METADATA_HEADERS: &[&str] = &["server", "x-powered-by"];

static RE_BITCOIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[13][a-km-zA-HJ-NP-Z1-9]{25,34}").unwrap());
static RE_PGP_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)-----BEGIN PGP PUBLIC KEY BLOCK-----.*?-----END PGP PUBLIC KEY BLOCK-----").unwrap()
});
static RE_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+").unwrap());
static RE_GA_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"UA-\d+-\d+").unwrap());

/// Keeps the headers that identify server software, with their original spelling.
pub fn extract_metadata(headers: &HeaderList) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| METADATA_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// `.onion` hyperlinks in first-seen order, without duplicates.
pub fn extract_onion_links(parser: &dyn PageParser, html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    parser
        .attribute_values(html, "a", "href")
        .into_iter()
        .filter(|href| href.contains(".onion"))
        .filter(|href| seen.insert(href.clone()))
        .collect()
}

pub fn extract_bitcoin_addresses(html: &str) -> Vec<String> {
    find_all(&RE_BITCOIN, html)
}

pub fn extract_pgp_keys(html: &str) -> Vec<String> {
    find_all(&RE_PGP_BLOCK, html)
}

pub fn extract_emails_and_ids(html: &str) -> EmailsAndIds {
    EmailsAndIds {
        emails: find_all(&RE_EMAIL, html),
        google_analytics_ids: find_all(&RE_GA_ID, html),
    }
}

/// SHA-1 hex digest of the raw page bytes, before any text decoding.
pub fn html_fingerprint(body: &[u8]) -> String {
    hex::encode(Sha1::digest(body))
}

fn find_all(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}
