//! Swap points for the page scans.
//!
//! The mirror's layout changes without notice. The pipeline only talks to
//! these traits, so a new matching rule can be dropped in without touching
//! the fetch/replay logic.

use crate::parser::{
    CaptchaMarkup, ParseError, ResourceLink, extract_captcha_markup, extract_resource_link,
};

/// Finds the document link on a landing page.
pub trait LinkExtractor: Send + Sync {
    /// Returns the resource link embedded in `page`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::ArticleNotFound`] when no link can be found.
    fn extract_link(&self, page: &str) -> Result<ResourceLink, ParseError>;
}

/// Reads CAPTCHA metadata out of a challenge page.
pub trait ChallengeExtractor: Send + Sync {
    /// Returns the image URL and ID of the CAPTCHA in `html`, which was served
    /// by `resource_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::CaptchaMarkup`] when the markup is not recognised.
    fn extract_challenge(&self, html: &str, resource_url: &str)
    -> Result<CaptchaMarkup, ParseError>;
}

/// Default link rule: first `http...pdf` after the `main_content` marker.
#[derive(Debug, Default, Clone, Copy)]
pub struct MainContentLinks;

impl LinkExtractor for MainContentLinks {
    fn extract_link(&self, page: &str) -> Result<ResourceLink, ParseError> {
        extract_resource_link(page)
    }
}

/// Default CAPTCHA rule: inner-frame origin, falling back to the resource origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptchaImageMarkup;

impl ChallengeExtractor for CaptchaImageMarkup {
    fn extract_challenge(
        &self,
        html: &str,
        resource_url: &str,
    ) -> Result<CaptchaMarkup, ParseError> {
        extract_captcha_markup(html, resource_url)
    }
}
