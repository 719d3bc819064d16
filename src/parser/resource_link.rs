//! Resource link extraction from the mirror's landing page.
//!
//! The landing page embeds the document (or the viewer that leads to it)
//! somewhere after the element whose id is `main_content`. The markup is not
//! reliably well-formed, so this is a single left-to-right scan over the raw
//! text rather than a tree walk:
//!
//! 1. find the `id = "main_content"` marker (any whitespace around `=`),
//! 2. find the first `http` after it,
//! 3. take everything up to and including the next `.pdf`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::ParseError;
use super::scan::{compile_static_regex, last_path_segment};

static MAIN_CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"\bid\s*=\s*"main_content""#));

const LINK_START: &str = "http";
const LINK_END: &str = ".pdf";

/// The document link found on a landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    /// Absolute URL of the document (or of the page interposing a challenge).
    pub url: String,
    /// File name for the eventual download (text after the final `/`).
    pub file_name: String,
}

impl ResourceLink {
    /// Builds a link, deriving the file name from the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let file_name = derive_file_name(&url).to_string();
        Self { url, file_name }
    }
}

/// Scans landing-page text for the embedded document URL.
///
/// # Errors
///
/// Returns [`ParseError::ArticleNotFound`] when the content marker, the link
/// start, or the `.pdf` terminator is missing.
pub fn extract_resource_link(page: &str) -> Result<ResourceLink, ParseError> {
    let Some(marker) = MAIN_CONTENT_RE.find(page) else {
        return Err(ParseError::article_not_found(
            "'main_content' region is missing from the landing page",
        ));
    };
    let region = &page[marker.start()..];

    let Some(start) = region.find(LINK_START) else {
        return Err(ParseError::article_not_found(
            "no link follows the 'main_content' region",
        ));
    };
    let link_tail = &region[start..];

    let Some(end) = link_tail.find(LINK_END) else {
        return Err(ParseError::article_not_found(
            "link in the 'main_content' region does not end in '.pdf'",
        ));
    };

    let url = &link_tail[..end + LINK_END.len()];
    trace!(marker_at = marker.start(), link_at = start, "located resource link");
    debug!(url = %url, "extracted resource link");
    Ok(ResourceLink::new(url))
}

/// Returns the text of `url` after its final `/`, whatever the extension.
#[must_use]
pub fn derive_file_name(url: &str) -> &str {
    last_path_segment(url)
}
