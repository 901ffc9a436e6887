//! URL handling for discovered resources: relative resolution and display names.

mod path;
mod sanitize;

pub use path::last_path_segment;
pub use sanitize::sanitize_resource_name;

use url::Url;

use crate::error::VerifyError;

/// Name used when the URL path yields nothing after sanitization.
pub const DEFAULT_RESOURCE_NAME: &str = "resource.bin";

/// Resolve a `src` value against the page it was found on. Absolute URLs pass through.
pub fn resolve_reference(base: &Url, reference: &str) -> Result<Url, VerifyError> {
    base.join(reference.trim()).map_err(|e| VerifyError::InvalidUrl {
        url: reference.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a page URL supplied by the user.
pub fn parse_page_url(raw: &str) -> Result<Url, VerifyError> {
    let url = Url::parse(raw.trim()).map_err(|e| VerifyError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(VerifyError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}

/// Sanitized display (and save) name for a resource URL.
///
/// # Examples
///
/// - `https://example.com/img/logo.png` → `"logo.png"`
/// - `https://example.com/` → `"resource.bin"`
pub fn resource_name(url: &Url) -> String {
    let sanitized = last_path_segment(url)
        .map(sanitize_resource_name)
        .unwrap_or_default();
    if sanitized.trim().is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_RESOURCE_NAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/blog/post.html").unwrap()
    }

    #[test]
    fn resolves_relative_against_page() {
        assert_eq!(
            resolve_reference(&base(), "/logo.png").unwrap().as_str(),
            "http://example.com/logo.png"
        );
        assert_eq!(
            resolve_reference(&base(), "img/a.png").unwrap().as_str(),
            "http://example.com/blog/img/a.png"
        );
        assert_eq!(
            resolve_reference(&base(), "//cdn.example.net/app.js").unwrap().as_str(),
            "http://cdn.example.net/app.js"
        );
    }

    #[test]
    fn absolute_reference_passes_through() {
        assert_eq!(
            resolve_reference(&base(), " https://cdn.example.net/app.js ")
                .unwrap()
                .as_str(),
            "https://cdn.example.net/app.js"
        );
    }

    #[test]
    fn page_url_must_be_http() {
        assert!(parse_page_url("http://example.com").is_ok());
        assert!(parse_page_url("ftp://example.com/x").is_err());
        assert!(parse_page_url("not a url").is_err());
    }

    #[test]
    fn resource_name_from_path() {
        let u = Url::parse("https://cdn.example.net/js/app.min.js?v=1").unwrap();
        assert_eq!(resource_name(&u), "app.min.js");
    }

    #[test]
    fn resource_name_fallback() {
        assert_eq!(
            resource_name(&Url::parse("https://example.com/").unwrap()),
            DEFAULT_RESOURCE_NAME
        );
        assert_eq!(
            resource_name(&Url::parse("https://example.com/%2F%3F").unwrap()),
            "2F3F"
        );
        assert_eq!(
            resource_name(&Url::parse("https://example.com/()").unwrap()),
            DEFAULT_RESOURCE_NAME
        );
    }
}
