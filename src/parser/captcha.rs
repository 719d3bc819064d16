//! CAPTCHA markup extraction from a mirror challenge page.
//!
//! When the resource URL answers with HTML instead of a document, the page is
//! a challenge. The image `src` in it is relative, so it has to be anchored on
//! the right host. The page has been seen in two shapes:
//!
//! - the challenge sits behind an inner frame (`id="pdf"`) whose `src` is the
//!   true document link, and the image lives on that frame's host;
//! - the challenge is served directly, and the image lives on the resource
//!   URL's host.
//!
//! Both are supported as a fallback chain: the frame source is tried first,
//! then the resource URL.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::ParseError;
use super::scan::{
    SRC_ATTR_RE, compile_static_regex, enclosing_tag, last_path_segment, origin_of, src_attribute,
};

static PDF_FRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"\bid\s*=\s*"pdf""#));

const CAPTCHA_MARKER: &str = "captcha";

/// Image location and opaque ID of a CAPTCHA, as read from the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaMarkup {
    /// Absolute URL of the CAPTCHA image.
    pub image_url: String,
    /// Identifier the mirror expects back alongside the answer.
    pub id: String,
}

/// Derives the CAPTCHA image URL and ID from a challenge page.
///
/// `resource_url` is the URL that served the challenge; it is the base for
/// relative frame sources and the fallback origin when no frame is present.
///
/// # Errors
///
/// Returns [`ParseError::CaptchaMarkup`] when no usable origin can be found,
/// the `captcha` token or its image `src` is missing, or the image file name
/// has no extension to strip.
pub fn extract_captcha_markup(html: &str, resource_url: &str) -> Result<CaptchaMarkup, ParseError> {
    let base_origin = captcha_base_origin(html, resource_url)?;
    let relative_path = captcha_image_path(html)?;

    let image_url = base_origin.join(relative_path).map_err(|e| {
        ParseError::captcha_markup(&format!(
            "image path '{relative_path}' cannot be joined onto {base_origin}: {e}"
        ))
    })?;
    let id = captcha_id(&image_url)?;

    debug!(image_url = %image_url, captcha_id = %id, "extracted captcha markup");
    Ok(CaptchaMarkup {
        image_url: image_url.to_string(),
        id,
    })
}

/// Picks the origin the CAPTCHA image path is relative to.
fn captcha_base_origin(html: &str, resource_url: &str) -> Result<Url, ParseError> {
    let resource = Url::parse(resource_url).ok();

    if let Some(frame_origin) = frame_source_url(html, resource.as_ref())
        .as_ref()
        .and_then(origin_of)
    {
        trace!(origin = %frame_origin, "using inner frame origin for captcha image");
        return Ok(frame_origin);
    }

    if let Some(resource_origin) = resource.as_ref().and_then(origin_of) {
        trace!(origin = %resource_origin, "using resource URL origin for captcha image");
        return Ok(resource_origin);
    }

    Err(ParseError::captcha_markup(&format!(
        "neither an inner frame nor the resource URL '{resource_url}' gives an absolute origin"
    )))
}

/// Resolves the `src` of the `id="pdf"` frame, if the page has one.
fn frame_source_url(html: &str, resource: Option<&Url>) -> Option<Url> {
    let marker = PDF_FRAME_RE.find(html)?;
    let src = src_attribute(enclosing_tag(html, marker.start()))?.trim();
    if src.is_empty() {
        return None;
    }
    match resource {
        Some(base) => base.join(src).ok(),
        None => Url::parse(src).ok(),
    }
}

/// Reads the image `src` that follows the first `captcha` token.
fn captcha_image_path(html: &str) -> Result<&str, ParseError> {
    let Some(marker) = html.find(CAPTCHA_MARKER) else {
        return Err(ParseError::captcha_markup("no 'captcha' token in challenge page"));
    };

    let path = SRC_ATTR_RE
        .captures(&html[marker..])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|path| !path.is_empty());

    path.ok_or_else(|| {
        ParseError::captcha_markup("no image 'src' attribute follows the 'captcha' token")
    })
}

/// The ID is the image file name with its extension stripped.
fn captcha_id(image_url: &Url) -> Result<String, ParseError> {
    let file_name = last_path_segment(image_url.path());
    let mut parts = file_name.split('.');
    let stem = parts.next().unwrap_or_default();
    if parts.next().is_none() || stem.is_empty() {
        return Err(ParseError::captcha_markup(&format!(
            "captcha image name '{file_name}' is not of the form <id>.<ext>"
        )));
    }
    Ok(stem.to_string())
}
