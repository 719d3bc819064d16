//! Article Fetch Core Library
//!
//! Retrieves scholarly articles by DOI from a document mirror. A retrieval
//! attempt either yields the document bytes or a CAPTCHA [`Challenge`] that a
//! human must answer before the mirror will serve the document.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - DOI normalization and targeted scans of mirror HTML
//! - [`mirror`] - Mirror configuration, HTTP client and error taxonomy
//! - [`retrieval`] - The retrieval pipeline and its per-request session

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod mirror;
pub mod parser;
pub mod retrieval;
mod user_agent;

// Re-export commonly used types
pub use mirror::{ConfigError, MirrorClient, MirrorConfig, RetrievalError, RetrievalErrorKind};
pub use parser::{NormalizedDoi, ParseError, normalize_doi};
pub use retrieval::{Article, ArticleRequest, Challenge, ChallengeForm, RetrievalOutcome, Retriever};
