//! Error types for the targeted page scans.

use thiserror::Error;

/// Errors that can occur while scanning user input or mirror markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The DOI input is empty or its resolver prefix cannot be located.
    #[error("invalid DOI '{input}': {reason}")]
    InvalidDoi {
        /// The raw input as supplied by the user
        input: String,
        /// Why the input was rejected
        reason: String,
    },

    /// The landing page does not carry the expected content region or link.
    #[error("article link not found in landing page: {reason}")]
    ArticleNotFound {
        /// Which marker was missing
        reason: String,
    },

    /// The challenge page no longer matches the expected CAPTCHA markup.
    #[error("captcha markup not recognised: {reason}")]
    CaptchaMarkup {
        /// Which marker was missing or malformed
        reason: String,
    },
}

impl ParseError {
    /// Creates an `InvalidDoi` error.
    #[must_use]
    pub fn invalid_doi(input: &str, reason: &str) -> Self {
        Self::InvalidDoi {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `ArticleNotFound` error.
    #[must_use]
    pub fn article_not_found(reason: &str) -> Self {
        Self::ArticleNotFound {
            reason: reason.to_string(),
        }
    }

    /// Creates a `CaptchaMarkup` error.
    #[must_use]
    pub fn captcha_markup(reason: &str) -> Self {
        Self::CaptchaMarkup {
            reason: reason.to_string(),
        }
    }
}
