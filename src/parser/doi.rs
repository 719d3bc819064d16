//! DOI normalization from free-form user input.
//!
//! Users paste either a bare DOI (`10.1080/09500340.2010.500105`) or a
//! resolver URL (`http://dx.doi.org/10.1080/09500340.2010.500105`). The mirror
//! only understands the bare form, so everything up to and including the
//! resolver's `.org/` is stripped. DOI syntax itself is not validated: the
//! mirror is the authority on whether an identifier exists.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ParseError;

const URL_MARKER: &str = "http";
const RESOLVER_DOMAIN: &str = ".org";
const RESOLVER_DOMAIN_WITH_SLASH: &str = ".org/";

/// A DOI with any resolver prefix removed.
///
/// Guaranteed non-empty and free of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedDoi(String);

impl NormalizedDoi {
    /// Returns the DOI string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the DOI string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedDoi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedDoi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extracts the canonical DOI from a bare DOI or a resolver URL.
///
/// # Errors
///
/// Returns [`ParseError::InvalidDoi`] when the input is blank, or when it looks
/// like a URL but carries no `.org/` resolver domain followed by a DOI.
///
/// # Examples
///
/// ```
/// use article_fetch::parser::normalize_doi;
///
/// let doi = normalize_doi("http://dx.doi.org/10.1080/09500340.2010.500105").unwrap();
/// assert_eq!(doi.as_str(), "10.1080/09500340.2010.500105");
/// ```
pub fn normalize_doi(input: &str) -> Result<NormalizedDoi, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::invalid_doi(input, "DOI is empty"));
    }

    if !trimmed.contains(URL_MARKER) {
        return Ok(NormalizedDoi(trimmed.to_string()));
    }

    let Some(domain_start) = trimmed.find(RESOLVER_DOMAIN) else {
        return Err(ParseError::invalid_doi(
            input,
            "could not locate a '.org' resolver domain in the URL",
        ));
    };

    let doi = trimmed
        .get(domain_start + RESOLVER_DOMAIN_WITH_SLASH.len()..)
        .map(str::trim)
        .unwrap_or_default();
    if doi.is_empty() {
        return Err(ParseError::invalid_doi(
            input,
            "resolver URL does not contain a DOI after '.org/'",
        ));
    }

    debug!(raw = %input, doi = %doi, "stripped resolver prefix from DOI");
    Ok(NormalizedDoi(doi.to_string()))
}
