//! CAPTCHA challenge records handed to the caller and echoed back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::parser::CaptchaMarkup;

/// A CAPTCHA that must be answered before the resource will serve the document.
///
/// Never retained server-side: the caller renders it, round-trips `id`, `doi`
/// and `resource_url` through its form, and submits exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Opaque CAPTCHA identifier posted back with the answer.
    pub id: String,
    /// Absolute URL the image was fetched from.
    pub image_url: String,
    /// Image bytes, base64-encoded (standard alphabet, padded).
    pub image_base64: String,
    /// The resource URL that served the challenge; the answer goes here.
    pub resource_url: String,
    /// DOI of the article being retrieved.
    pub doi: String,
}

impl Challenge {
    /// Assembles a challenge from parsed markup and the fetched image.
    #[must_use]
    pub fn new(
        markup: CaptchaMarkup,
        image: &[u8],
        resource_url: impl Into<String>,
        doi: impl Into<String>,
    ) -> Self {
        Self {
            id: markup.id,
            image_url: markup.image_url,
            image_base64: STANDARD.encode(image),
            resource_url: resource_url.into(),
            doi: doi.into(),
        }
    }

    /// Decodes the image bytes.
    ///
    /// # Errors
    ///
    /// Returns a decode error if `image_base64` was altered in transit.
    pub fn image_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.image_base64)
    }

    /// File extension of the image (`jpg`, `png`, ...), if the URL has one.
    #[must_use]
    pub fn image_extension(&self) -> Option<&str> {
        let path = self.image_url.split(['?', '#']).next().unwrap_or_default();
        let file_name = path.rsplit('/').next().unwrap_or_default();
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// Pairs this challenge with the human-supplied answer.
    #[must_use]
    pub fn answer(self, answer: impl Into<String>) -> ChallengeForm {
        ChallengeForm {
            answer: answer.into(),
            id: self.id,
            doi: self.doi,
            resource_url: self.resource_url,
        }
    }
}

/// The fields a rendered challenge form sends back on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeForm {
    /// The text the human read from the image.
    pub answer: String,
    /// [`Challenge::id`] echoed back.
    pub id: String,
    /// [`Challenge::doi`] echoed back.
    pub doi: String,
    /// [`Challenge::resource_url`] echoed back.
    pub resource_url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Challenge {
        Challenge::new(
            CaptchaMarkup {
                image_url: "http://host/img/5a566b72e229c.jpg".to_string(),
                id: "5a566b72e229c".to_string(),
            },
            b"\xff\xd8\xff\xe0fake-jpeg",
            "http://host/journal-article/xyz/paper.pdf",
            "10.1080/09500340.2010.500105",
        )
    }

    #[test]
    fn test_challenge_image_is_base64_encoded() {
        let challenge = sample();
        assert_ne!(challenge.image_base64.as_bytes(), b"\xff\xd8\xff\xe0fake-jpeg");
        assert_eq!(challenge.image_bytes().unwrap(), b"\xff\xd8\xff\xe0fake-jpeg");
    }

    #[test]
    fn test_challenge_image_extension() {
        assert_eq!(sample().image_extension(), Some("jpg"));

        let mut challenge = sample();
        challenge.image_url = "http://host/img/abc.png?x=1".to_string();
        assert_eq!(challenge.image_extension(), Some("png"));

        challenge.image_url = "http://host/img/abc".to_string();
        assert_eq!(challenge.image_extension(), None);
    }

    #[test]
    fn test_challenge_answer_carries_replay_fields() {
        let form = sample().answer("x7k2p");
        assert_eq!(form.answer, "x7k2p");
        assert_eq!(form.id, "5a566b72e229c");
        assert_eq!(form.doi, "10.1080/09500340.2010.500105");
        assert_eq!(form.resource_url, "http://host/journal-article/xyz/paper.pdf");
    }

    #[test]
    fn test_challenge_json_round_trip_preserves_fields() {
        let challenge = sample();
        let json = serde_json::to_string(&challenge).unwrap();
        assert!(json.contains("\"resource_url\""));
        let restored: Challenge = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, challenge);
    }
}
