//! Filename hint from a URL path.

use url::Url;

/// Last path segment of `url`, exactly as it appears (still percent-encoded).
///
/// Returns `None` for an empty or root path. Unlike a plain `split('/')`, query strings and
/// fragments never leak into the segment.
pub fn last_path_segment(url: &Url) -> Option<&str> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}
