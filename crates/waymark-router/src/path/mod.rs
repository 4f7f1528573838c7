/// Path utilities for query splitting and percent coding
///
/// All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

/// Splits a path at the first `?`
///
/// # Examples
///
/// ```
/// use waymark_router::path::split_query;
///
/// assert_eq!(split_query("/user/42?tab=info"), ("/user/42", Some("tab=info")));
/// assert_eq!(split_query("/user/42"), ("/user/42", None));
/// ```
pub fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((pathname, query)) => (pathname, Some(query)),
        None => (path, None),
    }
}

/// Percent-decodes a URI component
///
/// Returns `Cow::Borrowed` when nothing needs decoding. Sequences that do not
/// decode to valid UTF-8 leave the input untouched.
///
/// # Examples
///
/// ```
/// use waymark_router::path::decode_uri_component;
///
/// assert_eq!(decode_uri_component("caf%C3%A9"), "café");
/// assert_eq!(decode_uri_component("a+b"), "a+b");
/// assert_eq!(decode_uri_component("%FF"), "%FF");
/// ```
pub fn decode_uri_component(value: &str) -> Cow<'_, str> {
    if !value.contains('%') {
        return Cow::Borrowed(value);
    }

    match urlencoding::decode(value) {
        Ok(Cow::Owned(decoded)) => Cow::Owned(decoded),
        Ok(Cow::Borrowed(_)) | Err(_) => Cow::Borrowed(value),
    }
}

/// Decodes a form-style component (`+` means space) when decoding is enabled
///
/// # Examples
///
/// ```
/// use waymark_router::path::decode_component;
///
/// assert_eq!(decode_component("a+b%21", true), "a b!");
/// assert_eq!(decode_component("a+b%21", false), "a+b%21");
/// ```
pub fn decode_component(value: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(value);
    }

    if value.contains('+') {
        let spaced = value.replace('+', " ");
        Cow::Owned(decode_uri_component(&spaced).into_owned())
    } else {
        decode_uri_component(value)
    }
}

/// Percent-encodes a URI component
///
/// Keeps the same unreserved set as browsers do for components:
/// ASCII alphanumerics and `- _ . ! ~ * ' ( )`.
///
/// # Examples
///
/// ```
/// use waymark_router::path::encode_component;
///
/// assert_eq!(encode_component("a b/c"), "a%20b%2Fc");
/// assert_eq!(encode_component("it's (ok)!"), "it's%20(ok)!");
/// ```
pub fn encode_component(value: &str) -> String {
    let encoded = urlencoding::encode(value);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }

    // urlencoding escapes a few marks that components leave alone
    [("%21", "!"), ("%2A", "*"), ("%27", "'"), ("%28", "("), ("%29", ")")]
        .iter()
        .fold(encoded.into_owned(), |acc, (from, to)| acc.replace(from, to))
}

/// Removes a base prefix from a path, yielding `/` when nothing is left
///
/// # Examples
///
/// ```
/// use waymark_router::path::strip_base;
///
/// assert_eq!(strip_base("/app/users", "/app"), "/users");
/// assert_eq!(strip_base("/app", "/app"), "/");
/// assert_eq!(strip_base("/users", "/app"), "/users");
/// ```
pub fn strip_base<'a>(path: &'a str, base: &str) -> &'a str {
    let stripped = path.strip_prefix(base).unwrap_or(path);
    if stripped.is_empty() {
        "/"
    } else {
        stripped
    }
}
