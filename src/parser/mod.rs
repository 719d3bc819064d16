//! Targeted scans over user input and mirror markup.
//!
//! Nothing here performs I/O. The mirror's pages are unstable and not valid
//! enough to justify a DOM parser, so each scan looks for a small number of
//! markers in the raw text and tolerates everything around them.
//!
//! - [`normalize_doi`] - bare DOI from free-form input
//! - [`extract_resource_link`] - document link from the landing page
//! - [`extract_captcha_markup`] - CAPTCHA image URL and ID from a challenge page

mod captcha;
mod doi;
mod error;
mod resource_link;
mod scan;

pub use captcha::{CaptchaMarkup, extract_captcha_markup};
pub use doi::{NormalizedDoi, normalize_doi};
pub use error::ParseError;
pub use resource_link::{ResourceLink, derive_file_name, extract_resource_link};
