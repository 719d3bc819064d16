//! Writes retrieval results to the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use article_fetch::{Article, Challenge};
use tracing::debug;

/// Name used when the resource URL yields no usable file name.
pub const FALLBACK_FILE_NAME: &str = "article.pdf";

const FALLBACK_IMAGE_EXTENSION: &str = "img";

/// Paths written for an issued challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedChallenge {
    /// The CAPTCHA image.
    pub image: PathBuf,
    /// The replayable challenge record (JSON).
    pub record: PathBuf,
}

/// Writes the document to `dir/<file name>` and returns the path.
pub fn save_article(article: &Article, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(document_file_name(&article.file_name));
    fs::write(&path, &article.bytes)
        .with_context(|| format!("Failed to write article to '{}'", path.display()))?;
    debug!(path = %path.display(), bytes = article.bytes.len(), "article saved");
    Ok(path)
}

/// Writes the CAPTCHA image and the challenge record.
pub fn save_challenge(challenge: &Challenge, dir: &Path) -> Result<SavedChallenge> {
    ensure_dir(dir)?;
    let stem = sanitize(&challenge.id);
    let extension = challenge
        .image_extension()
        .map_or(FALLBACK_IMAGE_EXTENSION.to_string(), sanitize);

    let image = dir.join(format!("captcha-{stem}.{extension}"));
    let bytes = challenge
        .image_bytes()
        .context("Challenge image is not valid base64")?;
    fs::write(&image, bytes)
        .with_context(|| format!("Failed to write CAPTCHA image to '{}'", image.display()))?;

    let record = dir.join(format!("challenge-{stem}.json"));
    let json = serde_json::to_string_pretty(challenge).context("Failed to encode challenge")?;
    fs::write(&record, json)
        .with_context(|| format!("Failed to write challenge record to '{}'", record.display()))?;

    debug!(image = %image.display(), record = %record.display(), "challenge saved");
    Ok(SavedChallenge { image, record })
}

/// Reads a challenge record written by [`save_challenge`].
pub fn load_challenge(path: &Path) -> Result<Challenge> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read challenge record '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse challenge record '{}'", path.display()))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))
}

fn document_file_name(name: &str) -> String {
    let cleaned = sanitize(name);
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0') && !c.is_control())
        .collect()
}
