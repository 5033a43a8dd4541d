// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::OPTIONS_PER_QUESTION;

/// A multiple-choice question, either embedded in an exam or in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    /// The question stem.
    pub text: String,

    /// Exactly four options for exam-embedded questions.
    pub options: Vec<String>,

    /// 0-based index into `options`.
    pub correct_answer_index: usize,

    /// Optional illustration (URL or data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Per-option images, aligned positionally with `options`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_images: Option<Vec<Option<String>>>,
}

/// Question as shown during an exam session: no answer key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_images: Option<Vec<Option<String>>>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            image_url: q.image_url.clone(),
            option_images: q.option_images.clone(),
        }
    }
}

/// DTO for a question inside an exam save request.
/// `id` is optional: new questions get a fresh UUID.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub id: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Question text cannot be empty."))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(max = 3, message = "Correct answer index must be between 0 and 3."))]
    pub correct_answer_index: usize,
    pub image_url: Option<String>,
    pub option_images: Option<Vec<Option<String>>>,
}

impl QuestionInput {
    pub fn into_question(self) -> Question {
        Question {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            text: self.text.trim().to_string(),
            options: self.options,
            correct_answer_index: self.correct_answer_index,
            image_url: self.image_url.filter(|u| !u.is_empty()),
            option_images: self.option_images.map(align_option_images),
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(validator::ValidationError::new("exactly_four_options"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// Pads or truncates option images so they line up with the four options.
pub fn align_option_images(mut images: Vec<Option<String>>) -> Vec<Option<String>> {
    images.resize(OPTIONS_PER_QUESTION, None);
    images
        .into_iter()
        .map(|img| img.filter(|s| !s.is_empty()))
        .collect()
}

/// True when the question can be embedded in an exam.
pub fn is_well_formed(q: &Question) -> bool {
    !q.text.trim().is_empty()
        && q.options.len() == OPTIONS_PER_QUESTION
        && q.correct_answer_index < q.options.len()
}
