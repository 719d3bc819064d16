//! Network side of retrieval: configuration, the mirror HTTP client, and the
//! error taxonomy every retrieval step reports through.

mod client;
mod config;
mod error;

pub use client::{MirrorClient, ResourceResponse};
pub use config::{ConfigError, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, MirrorConfig};
pub use error::{
    MSG_ARTICLE_NOT_FOUND, MSG_INTERNAL, MSG_INVALID_DOI, MSG_UPSTREAM_OVERLOADED,
    MSG_UPSTREAM_UNAVAILABLE, RetrievalError, RetrievalErrorKind,
};
