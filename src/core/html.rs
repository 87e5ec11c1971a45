// src/core/html.rs

use scraper::{Html, Selector};
use tracing::warn;

/// Structural HTML queries the probes need.
pub trait PageParser: Send + Sync {
    /// Values of `attr` on every `<tag>` element that carries it, in document order.
    fn attribute_values(&self, html: &str, tag: &str, attr: &str) -> Vec<String>;
}

/// [`PageParser`] backed by `scraper`'s html5ever parse tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperParser;

impl PageParser for ScraperParser {
    fn attribute_values(&self, html: &str, tag: &str, attr: &str) -> Vec<String> {
        let selector = match Selector::parse(&format!("{tag}[{attr}]")) {
            Ok(s) => s,
            Err(e) => {
                warn!(tag, attr, error = %e, "Invalid selector.");
                return Vec::new();
            }
        };
        let document = Html::parse_document(html);
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect()
    }
}
