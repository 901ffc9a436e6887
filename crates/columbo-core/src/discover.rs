//! Page resource discovery: every element carrying a `src` attribute.

use scraper::{Html, Selector};
use url::Url;

use crate::url_model::{resolve_reference, resource_name};

/// A sub-resource found on a page, already resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    /// Sanitized display name (also the save filename).
    pub name: String,
    pub url: Url,
}

/// Raw `src` values in document order. Empty values are skipped.
pub fn src_attributes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("[src]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Discover fetchable resources on the page at `base`.
///
/// `base` is always the page being processed; values that do not resolve to an http(s) URL
/// (`data:`, `javascript:`, malformed) are not resources and are dropped here.
pub fn discover_resources(html: &str, base: &Url) -> Vec<DiscoveredResource> {
    src_attributes(html)
        .into_iter()
        .filter_map(|raw| match resolve_reference(base, &raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(url) => {
                tracing::debug!(scheme = url.scheme(), "ignoring non-http src");
                None
            }
            Err(e) => {
                tracing::debug!(src = %raw, error = %e, "ignoring unresolvable src");
                None
            }
        })
        .map(|url| DiscoveredResource {
            name: resource_name(&url),
            url,
        })
        .collect()
}
