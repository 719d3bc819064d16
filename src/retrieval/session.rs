//! Per-request retrieval state.
//!
//! A [`RetrievalSession`] is owned by the single call that created it and is
//! dropped when that call returns. The document and a live challenge are two
//! arms of one state enum, so a session can never hold both.

use crate::mirror::RetrievalErrorKind;
use crate::parser::{NormalizedDoi, ResourceLink};

use super::{Article, Challenge, RetrievalOutcome};

/// Observable stage of a [`RetrievalSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Created, nothing fetched yet.
    Pending,
    /// The resource URL is known.
    ResourceLocated,
    /// The resource answered with a CAPTCHA.
    ChallengeIssued,
    /// The document bytes are in hand.
    Resolved,
    /// The attempt ended with an error of this kind.
    Failed(RetrievalErrorKind),
}

#[derive(Debug)]
enum State {
    Pending,
    ResourceLocated,
    ChallengeIssued(Challenge),
    Resolved(Article),
    Failed(RetrievalErrorKind),
}

/// The unit of work for one article attempt.
#[derive(Debug)]
pub struct RetrievalSession {
    doi: NormalizedDoi,
    resource: Option<ResourceLink>,
    state: State,
}

impl RetrievalSession {
    /// Starts a session that still has to scrape the landing page.
    #[must_use]
    pub fn new(doi: NormalizedDoi) -> Self {
        Self {
            doi,
            resource: None,
            state: State::Pending,
        }
    }

    /// Starts a session at a known resource URL, as when replaying a challenge.
    #[must_use]
    pub fn resume(doi: NormalizedDoi, resource: ResourceLink) -> Self {
        Self {
            doi,
            resource: Some(resource),
            state: State::ResourceLocated,
        }
    }

    /// Returns the DOI this session retrieves.
    #[must_use]
    pub fn doi(&self) -> &NormalizedDoi {
        &self.doi
    }

    /// Returns the resource link once located.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceLink> {
        self.resource.as_ref()
    }

    /// Returns the resource URL once located.
    #[must_use]
    pub fn resource_url(&self) -> Option<&str> {
        self.resource.as_ref().map(|link| link.url.as_str())
    }

    /// Returns the current stage.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match &self.state {
            State::Pending => SessionStatus::Pending,
            State::ResourceLocated => SessionStatus::ResourceLocated,
            State::ChallengeIssued(_) => SessionStatus::ChallengeIssued,
            State::Resolved(_) => SessionStatus::Resolved,
            State::Failed(kind) => SessionStatus::Failed(*kind),
        }
    }

    /// Returns the document bytes; present only when resolved.
    #[must_use]
    pub fn pdf_bytes(&self) -> Option<&[u8]> {
        match &self.state {
            State::Resolved(article) => Some(&article.bytes),
            _ => None,
        }
    }

    /// Returns the live challenge; present only when one was issued.
    #[must_use]
    pub fn challenge(&self) -> Option<&Challenge> {
        match &self.state {
            State::ChallengeIssued(challenge) => Some(challenge),
            _ => None,
        }
    }

    /// Records the resource link found on the landing page.
    pub fn locate(&mut self, resource: ResourceLink) {
        self.resource = Some(resource);
        self.state = State::ResourceLocated;
    }

    /// Records the fetched document, clearing any challenge.
    pub fn resolve(&mut self, article: Article) {
        self.state = State::Resolved(article);
    }

    /// Records an issued challenge, clearing any document.
    pub fn issue_challenge(&mut self, challenge: Challenge) {
        self.state = State::ChallengeIssued(challenge);
    }

    /// Marks the attempt as failed. Partial results are dropped.
    pub fn fail(&mut self, kind: RetrievalErrorKind) {
        self.state = State::Failed(kind);
    }

    /// Consumes the session and yields its result, if it reached one.
    #[must_use]
    pub fn into_outcome(self) -> Option<RetrievalOutcome> {
        match self.state {
            State::Resolved(article) => Some(RetrievalOutcome::Document(article)),
            State::ChallengeIssued(challenge) => Some(RetrievalOutcome::Challenge(challenge)),
            State::Pending | State::ResourceLocated | State::Failed(_) => None,
        }
    }
}
