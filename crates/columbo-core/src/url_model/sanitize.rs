//! Display/save name sanitization.

/// Keeps only alphanumerics, space, dot and underscore, then strips trailing whitespace.
///
/// `"pic%20(1).png"` becomes `"pic201.png"`; nothing is replaced, disallowed characters are
/// simply dropped.
pub fn sanitize_resource_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect();
    kept.trim_end().to_string()
}
