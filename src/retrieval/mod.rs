//! The retrieval pipeline.
//!
//! One attempt is a strictly linear chain of calls, each needing the previous
//! one's output:
//!
//! ```text
//! DOI -> normalize -> GET landing page -> extract resource link
//!     -> GET resource -> document
//!                     -> HTML -> extract captcha -> GET image -> Challenge
//! ```
//!
//! A [`Challenge`] goes back to the caller. Answering it posts the answer to
//! the resource URL and re-enters the chain at "GET resource"; the post itself
//! never returns the document, only the fetch after it can.
//!
//! # Example
//!
//! ```no_run
//! use article_fetch::mirror::MirrorConfig;
//! use article_fetch::retrieval::{ArticleRequest, RetrievalOutcome, Retriever};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let retriever = Retriever::new(MirrorConfig::new("https://mirror.example/")?)?;
//! match retriever.retrieve(&ArticleRequest::new("10.1038/nature14539")).await {
//!     Ok(RetrievalOutcome::Document(article)) => println!("{}", article.file_name),
//!     Ok(RetrievalOutcome::Challenge(challenge)) => println!("captcha {}", challenge.id),
//!     Err(error) => eprintln!("{}", error.user_message()),
//! }
//! # Ok(())
//! # }
//! ```

mod challenge;
mod extractors;
mod session;

pub use challenge::{Challenge, ChallengeForm};
pub use extractors::{CaptchaImageMarkup, ChallengeExtractor, LinkExtractor, MainContentLinks};
pub use session::{RetrievalSession, SessionStatus};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::mirror::{
    ConfigError, MirrorClient, MirrorConfig, ResourceResponse, RetrievalError,
};
use crate::parser::{NormalizedDoi, ResourceLink, normalize_doi};

/// A user's request to retrieve one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRequest {
    /// DOI or DOI-bearing URL exactly as entered.
    pub raw_doi: String,
}

impl ArticleRequest {
    /// Creates a request from raw user input.
    #[must_use]
    pub fn new(raw_doi: impl Into<String>) -> Self {
        Self {
            raw_doi: raw_doi.into(),
        }
    }
}

/// A retrieved document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// The document body exactly as served.
    pub bytes: Vec<u8>,
    /// Name derived from the resource URL (text after its final `/`).
    pub file_name: String,
}

/// Successful end of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// The document was served.
    Document(Article),
    /// A CAPTCHA stands in the way; answer it with [`Retriever::submit_answer`].
    Challenge(Challenge),
}

/// Drives retrieval attempts against one mirror.
///
/// Holds no per-request state, so one `Retriever` can serve many concurrent
/// callers.
pub struct Retriever {
    client: MirrorClient,
    links: Box<dyn LinkExtractor>,
    challenges: Box<dyn ChallengeExtractor>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Creates a retriever with the default page scans.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn new(config: MirrorConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_extractors(
            MirrorClient::new(config)?,
            Box::new(MainContentLinks),
            Box::new(CaptchaImageMarkup),
        ))
    }

    /// Creates a retriever with custom page scans.
    #[must_use]
    pub fn with_extractors(
        client: MirrorClient,
        links: Box<dyn LinkExtractor>,
        challenges: Box<dyn ChallengeExtractor>,
    ) -> Self {
        Self {
            client,
            links,
            challenges,
        }
    }

    /// Returns the underlying mirror client.
    #[must_use]
    pub fn client(&self) -> &MirrorClient {
        &self.client
    }

    /// Runs a full attempt for `request`, from DOI normalization onwards.
    ///
    /// # Errors
    ///
    /// Returns the [`RetrievalError`] of the first step that failed. No
    /// partial document or challenge is returned alongside it.
    #[instrument(skip(self, request), fields(raw_doi = %request.raw_doi))]
    pub async fn retrieve(
        &self,
        request: &ArticleRequest,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let doi = normalize_doi(&request.raw_doi).map_err(|e| {
            warn!(error = %e, "rejected DOI input");
            RetrievalError::from(e)
        })?;
        self.drive(RetrievalSession::new(doi)).await
    }

    /// Answers `challenge` and fetches its resource again.
    ///
    /// # Errors
    ///
    /// See [`Retriever::submit_form`].
    pub async fn submit_answer(
        &self,
        challenge: Challenge,
        answer: &str,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        self.submit_form(challenge.answer(answer)).await
    }

    /// Posts a challenge form back to its resource URL, then fetches that
    /// resource again.
    ///
    /// A non-2xx answer post is only logged: whether the answer was right shows
    /// in the fetch that follows, which may serve the document or a new
    /// challenge.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::InvalidDoi`] for a blank echoed DOI,
    /// [`RetrievalError::UpstreamUnavailable`] when the post cannot be
    /// delivered, and otherwise whatever the resource fetch reports.
    #[instrument(skip(self, form), fields(captcha_id = %form.id, resource_url = %form.resource_url))]
    pub async fn submit_form(&self, form: ChallengeForm) -> Result<RetrievalOutcome, RetrievalError> {
        let doi = normalize_doi(&form.doi)?;

        let status = self
            .client
            .post_answer(&form.resource_url, &form.id, &form.answer)
            .await?;
        info!(status, "captcha answer posted; fetching resource again");

        let session = RetrievalSession::resume(doi, ResourceLink::new(form.resource_url));
        self.drive(session).await
    }

    /// Builds a [`Challenge`] from a challenge page: parses the CAPTCHA markup
    /// and fetches its image.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::CaptchaParseFailure`] if the markup is not
    /// recognised and [`RetrievalError::UpstreamUnavailable`] if the image
    /// cannot be fetched.
    pub async fn extract_challenge(
        &self,
        html: &str,
        resource_url: &str,
        doi: &NormalizedDoi,
    ) -> Result<Challenge, RetrievalError> {
        let markup = self
            .challenges
            .extract_challenge(html, resource_url)
            .map_err(|e| {
                error!(
                    layout_changed = true,
                    resource_url = %resource_url,
                    error = %e,
                    "challenge page no longer matches the expected captcha markup"
                );
                RetrievalError::from(e)
            })?;

        let image = self.client.fetch_image(&markup.image_url).await?;
        Ok(Challenge::new(markup, &image, resource_url, doi.as_str()))
    }

    async fn drive(
        &self,
        mut session: RetrievalSession,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        if let Err(error) = self.advance(&mut session).await {
            session.fail(error.kind());
            warn!(kind = ?error.kind(), error = %error, "retrieval attempt failed");
            return Err(error);
        }

        let resource_url = session.resource_url().unwrap_or_default().to_string();
        let status = session.status();
        session.into_outcome().ok_or_else(|| {
            RetrievalError::unavailable(
                resource_url,
                format!("retrieval stopped at {status:?} without a result"),
            )
        })
    }

    async fn advance(&self, session: &mut RetrievalSession) -> Result<(), RetrievalError> {
        if session.status() == SessionStatus::Pending {
            let page = self.client.fetch_landing_page(session.doi()).await?;
            let link = self.links.extract_link(&page)?;
            session.locate(link);
        }

        let Some(link) = session.resource().cloned() else {
            return Err(RetrievalError::ArticleNotFound {
                reason: "no resource link was located".to_string(),
            });
        };

        match self.client.fetch_resource(&link.url).await? {
            ResourceResponse::Document(bytes) => {
                info!(
                    url = %link.url,
                    file_name = %link.file_name,
                    bytes = bytes.len(),
                    "article retrieved"
                );
                session.resolve(Article {
                    bytes,
                    file_name: link.file_name,
                });
            }
            ResourceResponse::ChallengePage(html) => {
                let challenge = self
                    .extract_challenge(&html, &link.url, session.doi())
                    .await?;
                info!(captcha_id = %challenge.id, url = %link.url, "captcha challenge issued");
                session.issue_challenge(challenge);
            }
        }
        Ok(())
    }
}
