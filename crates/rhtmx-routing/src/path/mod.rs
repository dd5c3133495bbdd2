/// Path utilities for tokenizing request paths and encoding generated ones
///
/// All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

/// Splits a request path into its raw `/`-delimited segments
///
/// **Pure function**: No side effects, deterministic output.
///
/// # Rules
///
/// - One leading `/` is ignored
/// - One trailing `/` is ignored
/// - `/` and the empty path have zero segments
/// - Interior empty segments (`//`) are kept so the matcher can reject them
///
/// # Examples
///
/// ```
/// use rhtmx_routing::path::split_segments;
///
/// assert_eq!(split_segments("/"), Vec::<&str>::new());
/// assert_eq!(split_segments("/Home/Index"), vec!["Home", "Index"]);
/// assert_eq!(split_segments("/Home/Index/"), vec!["Home", "Index"]);
/// assert_eq!(split_segments("/a//b"), vec!["a", "", "b"]);
/// ```
pub fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Vec::new();
    }

    trimmed.split('/').collect()
}

/// Raw, undecoded remainder of `path` starting at segment `index`
///
/// Used to capture the unsplit remainder of a path for catch-all parameters.
pub(crate) fn remainder_from(path: &str, index: usize) -> &str {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let mut rest = trimmed;
    for _ in 0..index {
        match rest.find('/') {
            Some(slash) => rest = &rest[slash + 1..],
            None => return "",
        }
    }
    rest
}

/// Percent-decodes a path segment
///
/// **Pure function** with zero-copy optimization using `Cow<'_, str>`:
/// text without `%` is returned borrowed. Invalid escapes or invalid UTF-8
/// leave the raw text untouched.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::path::decode_segment;
/// use std::borrow::Cow;
///
/// assert!(matches!(decode_segment("plain"), Cow::Borrowed("plain")));
/// assert_eq!(decode_segment("a%20b"), "a b");
/// assert_eq!(decode_segment("a%2Fb"), "a/b");
/// ```
pub fn decode_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }

    match urlencoding::decode(segment) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Borrowed(segment),
    }
}

/// Percent-encodes a value for a URL path segment, `/` included
///
/// # Examples
///
/// ```
/// use rhtmx_routing::path::encode_value;
///
/// assert_eq!(encode_value("a/b b1"), "a%2Fb%20b1");
/// assert_eq!(encode_value("п"), "%D0%BF");
/// ```
pub fn encode_value(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Percent-encodes each `/`-separated piece of a value, keeping the slashes
///
/// # Examples
///
/// ```
/// use rhtmx_routing::path::encode_preserving_slashes;
///
/// assert_eq!(encode_preserving_slashes("a/b b1/c c1"), "a/b%20b1/c%20c1");
/// assert_eq!(encode_preserving_slashes("/"), "/");
/// ```
pub fn encode_preserving_slashes(value: &str) -> String {
    value
        .split('/')
        .map(|piece| urlencoding::encode(piece))
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalizes a path base: leading `/`, no trailing `/`, segments encoded
///
/// An empty or root base yields the empty string.
///
/// # Examples
///
/// ```
/// use rhtmx_routing::path::normalize_path_base;
///
/// assert_eq!(normalize_path_base(""), "");
/// assert_eq!(normalize_path_base("/"), "");
/// assert_eq!(normalize_path_base("app/"), "/app");
/// assert_eq!(normalize_path_base("/my app"), "/my%20app");
/// ```
pub fn normalize_path_base(path_base: &str) -> String {
    let trimmed = path_base.trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("/{}", encode_preserving_slashes(trimmed))
}
