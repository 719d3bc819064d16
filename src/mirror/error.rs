//! Error types for article retrieval.
//!
//! [`RetrievalError`] is the closed set of ways one retrieval attempt can
//! fail. Each variant keeps enough context for logs; only
//! [`RetrievalError::user_message`] is meant to cross the user boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::ParseError;

/// User-facing label for [`RetrievalErrorKind::InvalidDoi`].
pub const MSG_INVALID_DOI: &str = "Please check if doi string is correct";
/// User-facing label for [`RetrievalErrorKind::UpstreamUnavailable`].
pub const MSG_UPSTREAM_UNAVAILABLE: &str = "Servers are not available, try again later";
/// User-facing label for [`RetrievalErrorKind::UpstreamOverloaded`].
pub const MSG_UPSTREAM_OVERLOADED: &str = "Servers are over capacity, try again later";
/// User-facing label for [`RetrievalErrorKind::ArticleNotFound`].
pub const MSG_ARTICLE_NOT_FOUND: &str = "Article with this doi does not exist";
/// User-facing label for [`RetrievalErrorKind::CaptchaParseFailure`].
pub const MSG_INTERNAL: &str = "Internal application error, try again later";

/// Errors that end a retrieval attempt. None of them are retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// The DOI input is empty or unparseable.
    #[error("invalid DOI '{input}': {reason}")]
    InvalidDoi {
        /// The raw input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Transport failure, timeout, or an unexpected status from the mirror.
    #[error("mirror unavailable at {url}: {reason}")]
    UpstreamUnavailable {
        /// The URL being fetched
        url: String,
        /// Transport error or status detail
        reason: String,
    },

    /// The resource host answered 502.
    #[error("mirror over capacity (HTTP 502) at {url}")]
    UpstreamOverloaded {
        /// The resource URL that returned 502
        url: String,
    },

    /// The landing page carries no recognisable document link.
    #[error("article not found: {reason}")]
    ArticleNotFound {
        /// Which marker was missing
        reason: String,
    },

    /// A challenge page was served but its markup no longer matches.
    #[error("captcha page layout not recognised: {reason}")]
    CaptchaParseFailure {
        /// Which marker was missing or malformed
        reason: String,
    },
}

/// Fieldless discriminant of [`RetrievalError`], for exhaustive matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalErrorKind {
    /// See [`RetrievalError::InvalidDoi`].
    InvalidDoi,
    /// See [`RetrievalError::UpstreamUnavailable`].
    UpstreamUnavailable,
    /// See [`RetrievalError::UpstreamOverloaded`].
    UpstreamOverloaded,
    /// See [`RetrievalError::ArticleNotFound`].
    ArticleNotFound,
    /// See [`RetrievalError::CaptchaParseFailure`].
    CaptchaParseFailure,
}

impl RetrievalErrorKind {
    /// Returns the fixed label shown to end users for this kind.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::InvalidDoi => MSG_INVALID_DOI,
            Self::UpstreamUnavailable => MSG_UPSTREAM_UNAVAILABLE,
            Self::UpstreamOverloaded => MSG_UPSTREAM_OVERLOADED,
            Self::ArticleNotFound => MSG_ARTICLE_NOT_FOUND,
            Self::CaptchaParseFailure => MSG_INTERNAL,
        }
    }
}

impl RetrievalError {
    /// Creates an upstream-unavailable error with a free-form reason.
    pub fn unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a transport-level reqwest error; timeouts are not distinguished.
    pub fn transport(url: impl Into<String>, source: &reqwest::Error) -> Self {
        let reason = if source.is_timeout() {
            format!("request timed out: {source}")
        } else {
            format!("transport error: {source}")
        };
        Self::unavailable(url, reason)
    }

    /// Maps a non-success HTTP status.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::unavailable(url, format!("unexpected HTTP status {status}"))
    }

    /// Creates an overloaded error for a 502 from the resource host.
    pub fn overloaded(url: impl Into<String>) -> Self {
        Self::UpstreamOverloaded { url: url.into() }
    }

    /// Returns the discriminant of this error.
    #[must_use]
    pub fn kind(&self) -> RetrievalErrorKind {
        match self {
            Self::InvalidDoi { .. } => RetrievalErrorKind::InvalidDoi,
            Self::UpstreamUnavailable { .. } => RetrievalErrorKind::UpstreamUnavailable,
            Self::UpstreamOverloaded { .. } => RetrievalErrorKind::UpstreamOverloaded,
            Self::ArticleNotFound { .. } => RetrievalErrorKind::ArticleNotFound,
            Self::CaptchaParseFailure { .. } => RetrievalErrorKind::CaptchaParseFailure,
        }
    }

    /// Returns the fixed label shown to end users. Never includes internal detail.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

impl From<ParseError> for RetrievalError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::InvalidDoi { input, reason } => Self::InvalidDoi { input, reason },
            ParseError::ArticleNotFound { reason } => Self::ArticleNotFound { reason },
            ParseError::CaptchaMarkup { reason } => Self::CaptchaParseFailure { reason },
        }
    }
}
