//! Shared helpers for the targeted markup scans: static regex compilation,
//! attribute lookup inside a single tag, and URL origin derivation.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// `src="..."` with optional whitespace around `=`; capture 1 is the value.
pub static SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?i)\bsrc\s*=\s*"([^"]*)""#));

/// Returns the byte range of the tag enclosing `pos`, from its `<` up to and
/// including its `>`. Unterminated tags extend to the end of the text.
#[must_use]
pub fn enclosing_tag(text: &str, pos: usize) -> &str {
    let start = text[..pos].rfind('<').unwrap_or(0);
    let end = text[pos..]
        .find('>')
        .map_or(text.len(), |offset| pos + offset + 1);
    &text[start..end]
}

/// Returns the value of the first `src` attribute in `fragment`.
#[must_use]
pub fn src_attribute(fragment: &str) -> Option<&str> {
    SRC_ATTR_RE
        .captures(fragment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns `scheme://host[:port]` of `url`.
#[must_use]
pub fn origin_of(url: &Url) -> Option<Url> {
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Url::parse(&origin.ascii_serialization()).ok()
}

/// Returns the text after the final `/`, or the whole text when there is none.
#[must_use]
pub fn last_path_segment(value: &str) -> &str {
    value.rsplit('/').next().unwrap_or(value)
}
