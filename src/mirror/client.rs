//! HTTP client wrapper for the document mirror.
//!
//! One [`MirrorClient`] owns one pooled `reqwest::Client`, configured once
//! with the mirror timeouts and the crate User-Agent. Every call maps
//! transport failures, timeouts and unexpected statuses onto
//! [`RetrievalError`] so callers never see reqwest types.

use std::panic::{AssertUnwindSafe, catch_unwind};

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Client, ClientBuilder, Proxy, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::config::{ConfigError, MirrorConfig};
use super::error::RetrievalError;
use crate::parser::NormalizedDoi;
use crate::user_agent;

const HTML_CONTENT_TYPE: &str = "text/html";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// What the resource URL served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceResponse {
    /// The binary document.
    Document(Vec<u8>),
    /// An HTML page, which means a CAPTCHA challenge is interposed.
    ChallengePage(String),
}

/// HTTP client for the mirror's landing pages, resources and challenges.
#[derive(Debug, Clone)]
pub struct MirrorClient {
    client: Client,
    config: MirrorConfig,
}

impl MirrorClient {
    /// Creates a client bound to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] when the reqwest client cannot be
    /// built.
    pub fn new(config: MirrorConfig) -> Result<Self, ConfigError> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Returns the configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Fetches the landing page for a DOI as text.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::UpstreamUnavailable`] for transport failures,
    /// timeouts and any non-2xx status.
    #[instrument(skip(self, doi), fields(doi = %doi))]
    pub async fn fetch_landing_page(&self, doi: &NormalizedDoi) -> Result<String, RetrievalError> {
        let url = self.config.landing_url(doi);
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "landing page request failed");
            return Err(RetrievalError::http_status(url, status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RetrievalError::transport(&url, &e))?;
        debug!(url = %url, bytes = text.len(), "fetched landing page");
        Ok(text)
    }

    /// Fetches the resource URL and classifies the body by `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::UpstreamOverloaded`] for HTTP 502 and
    /// [`RetrievalError::UpstreamUnavailable`] for every other failure.
    #[instrument(skip(self))]
    pub async fn fetch_resource(&self, url: &str) -> Result<ResourceResponse, RetrievalError> {
        let response = self.get(url).await?;

        let status = response.status();
        if status == StatusCode::BAD_GATEWAY {
            warn!(url = %url, "resource host is over capacity");
            return Err(RetrievalError::overloaded(url));
        }
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "resource request failed");
            return Err(RetrievalError::http_status(url, status.as_u16()));
        }

        if is_html(response.headers()) {
            let html = response
                .text()
                .await
                .map_err(|e| RetrievalError::transport(url, &e))?;
            debug!(url = %url, bytes = html.len(), "resource served an HTML challenge page");
            return Ok(ResourceResponse::ChallengePage(html));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RetrievalError::transport(url, &e))?;
        debug!(url = %url, bytes = bytes.len(), "resource served a document");
        Ok(ResourceResponse::Document(bytes.to_vec()))
    }

    /// Fetches the raw CAPTCHA image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::UpstreamUnavailable`] for transport failures
    /// and any non-2xx status.
    #[instrument(skip(self))]
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, RetrievalError> {
        let response = self.get(url).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "captcha image request failed");
            return Err(RetrievalError::http_status(url, status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RetrievalError::transport(url, &e))?;
        Ok(bytes.to_vec())
    }

    /// Posts a CAPTCHA answer to the resource URL and returns the HTTP status.
    ///
    /// The mirror never answers this post with the document; a correct answer
    /// only makes the next fetch of `resource_url` succeed. A non-2xx status is
    /// therefore logged and returned, not treated as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::UpstreamUnavailable`] when the post cannot be
    /// delivered at all (transport failure or timeout).
    #[instrument(skip(self, answer))]
    pub async fn post_answer(
        &self,
        resource_url: &str,
        captcha_id: &str,
        answer: &str,
    ) -> Result<u16, RetrievalError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("answer", answer)
            .append_pair("id", captcha_id)
            .finish();

        let response = self
            .client
            .post(resource_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| RetrievalError::transport(resource_url, &e))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            debug!(url = %resource_url, status, "captcha answer accepted for delivery");
        } else {
            warn!(url = %resource_url, status, "captcha answer post returned non-success status");
        }
        Ok(status)
    }

    async fn get(&self, url: &str) -> Result<Response, RetrievalError> {
        self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, timeout = e.is_timeout(), "mirror request failed");
            RetrievalError::transport(url, &e)
        })
    }
}

fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains(HTML_CONTENT_TYPE))
}

fn build_client(config: &MirrorConfig) -> Result<Client, ConfigError> {
    match try_build_client(config, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when reading system proxy
            // settings; env proxies still apply on the fallback path.
            warn!("HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback");
            match try_build_client(config, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ConfigError::HttpClient {
                    reason: "client builder panicked while applying env-proxy fallback".to_string(),
                }),
                Err(BuildClientFailure::Build(error)) => Err(ConfigError::HttpClient {
                    reason: error.to_string(),
                }),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(ConfigError::HttpClient {
            reason: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    config: &MirrorConfig,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(|| {
        let mut builder = base_builder(config);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(config: &MirrorConfig) -> ClientBuilder {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.read_timeout())
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    let names: &[&str] = match scheme {
        "https" => &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"],
        "http" => &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"],
        _ => return None,
    };
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers_with_content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_is_html_detects_html_with_charset() {
        assert!(is_html(&headers_with_content_type("text/html; charset=utf-8")));
    }

    #[test]
    fn test_is_html_case_insensitive() {
        assert!(is_html(&headers_with_content_type("Text/HTML")));
    }

    #[test]
    fn test_is_html_rejects_pdf() {
        assert!(!is_html(&headers_with_content_type("application/pdf")));
    }

    #[test]
    fn test_is_html_missing_header_is_document() {
        assert!(!is_html(&HeaderMap::new()));
    }

    #[test]
    fn test_mirror_client_new_keeps_config() {
        let config = MirrorConfig::new("http://mirror.example/").unwrap();
        let client = MirrorClient::new(config.clone()).unwrap();
        assert_eq!(client.config(), &config);
    }
}
