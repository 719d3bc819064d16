//! Mirror connection settings, injected into the client at construction.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::parser::NormalizedDoi;

/// Default HTTP connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP request timeout (30 seconds). The mirror is slow, not dead.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Errors raised while assembling mirror configuration.
///
/// These are start-up failures, distinct from per-request retrieval errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No mirror base URL was supplied.
    #[error("mirror base URL is not set\n  Suggestion: pass --mirror-url or set `mirror_url` in the config file")]
    MissingMirrorUrl,

    /// The mirror base URL is not an absolute http(s) URL.
    #[error("invalid mirror base URL '{url}': {reason}")]
    InvalidMirrorUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A timeout of zero would disable the bound every call must carry.
    #[error("invalid {field}: timeouts must be at least one second")]
    InvalidTimeout {
        /// Which timeout was rejected
        field: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    HttpClient {
        /// Builder error detail
        reason: String,
    },
}

/// Base URL and timeouts for talking to the document mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    base_url: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl MirrorConfig {
    /// Creates a config for `base_url` with default timeouts.
    ///
    /// A trailing `/` is appended when missing, since DOIs are concatenated
    /// directly onto the base.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingMirrorUrl`] for a blank URL and
    /// [`ConfigError::InvalidMirrorUrl`] for anything that is not absolute
    /// `http`/`https`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = base_url.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingMirrorUrl);
        }

        let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidMirrorUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidMirrorUrl {
                url: trimmed.to_string(),
                reason: format!("scheme '{}' is not supported", parsed.scheme()),
            });
        }

        let mut base_url = trimmed.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            base_url,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        })
    }

    /// Replaces the connect and request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] if either duration is zero.
    pub fn with_timeouts(
        mut self,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        if connect_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                field: "connect timeout",
            });
        }
        if read_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                field: "read timeout",
            });
        }
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        Ok(self)
    }

    /// Returns the base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the overall request timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Builds the landing-page URL for a DOI.
    #[must_use]
    pub fn landing_url(&self, doi: &NormalizedDoi) -> String {
        format!("{}{}", self.base_url, doi.as_str())
    }
}
