// src/core/scanner/exif_scanner.rs

use crate::core::html::PageParser;
use crate::core::image_meta::ImageDecoder;
use crate::core::models::{ExifValue, ImageExif};
use crate::core::transport::Transport;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Images fetched at the same time for one page.
const IMAGE_FETCH_CONCURRENCY: usize = 4;

/// Why a single image produced no entry. Never surfaces in the report.
#[derive(Debug, thiserror::Error)]
enum ImageSkip {
    #[error("bad image URL: {0}")]
    BadUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("no metadata")]
    NoMetadata,
}

/// Downloads every `<img src>` on the page and collects its embedded metadata.
///
/// Each image is handled on its own: a bad URL, a failed download, an
/// undecodable file or an image without metadata only drops that image.
pub async fn extract_image_metadata(
    transport: &dyn Transport,
    parser: &dyn PageParser,
    decoder: &dyn ImageDecoder,
    html: &str,
    base_url: &str,
    timeout: Duration,
) -> Vec<ImageExif> {
    let sources: Vec<String> = parser
        .attribute_values(html, "img", "src")
        .into_iter()
        .filter(|src| !src.is_empty())
        .collect();
    info!(images = sources.len(), "Extracting image metadata.");

    let outcomes: Vec<Result<ImageExif, ImageSkip>> = stream::iter(sources)
        .map(move |src| async move { inspect_image(transport, decoder, base_url, &src, timeout).await })
        .buffered(IMAGE_FETCH_CONCURRENCY)
        .collect()
        .await;

    let results: Vec<ImageExif> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(found) => Some(found),
            Err(skip) => {
                debug!(reason = %skip, "Image skipped.");
                None
            }
        })
        .collect();

    info!(with_metadata = results.len(), "Image metadata extraction finished.");
    results
}

async fn inspect_image(
    transport: &dyn Transport,
    decoder: &dyn ImageDecoder,
    base_url: &str,
    src: &str,
    timeout: Duration,
) -> Result<ImageExif, ImageSkip> {
    let full_url = resolve(base_url, src)?;
    let response = transport.get(&full_url, timeout).await.map_err(|e| ImageSkip::Fetch(e.to_string()))?;
    let tags = decoder.read_metadata(&response.body).map_err(|e| ImageSkip::Decode(e.to_string()))?;
    if tags.is_empty() {
        return Err(ImageSkip::NoMetadata);
    }
    Ok(ImageExif {
        src: full_url,
        exif: tags.into_iter().map(|(tag, value)| (tag, ExifValue::from(value))).collect(),
    })
}

fn resolve(base_url: &str, src: &str) -> Result<String, ImageSkip> {
    let base = Url::parse(base_url).map_err(|e| ImageSkip::BadUrl(e.to_string()))?;
    base.join(src).map(String::from).map_err(|e| ImageSkip::BadUrl(e.to_string()))
}
