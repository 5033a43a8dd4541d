// src/generator.rs
//
// AI question drafting. The teacher gives a topic and/or a document; the
// model answers with a JSON array of four-option questions that are
// appended to the exam being edited.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    config::{Config, OPTIONS_PER_QUESTION},
    error::AppError,
    models::question::Question,
};

/// Inline document sent along with the prompt (PDF or image).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Base64 without the `data:` prefix.
    #[validate(length(min = 1))]
    pub data: String,
    #[validate(length(min = 1, max = 100))]
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(length(max = 2000))]
    pub prompt: Option<String>,
    #[validate(nested)]
    pub attachment: Option<Attachment>,
}

impl GenerateRequest {
    pub fn is_empty(&self) -> bool {
        self.prompt.as_deref().map(str::trim).unwrap_or("").is_empty() && self.attachment.is_none()
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<Vec<Question>, AppError>;
}

fn instructions(request: &GenerateRequest) -> String {
    let source = if request.attachment.is_some() {
        "Yüklediğim belgedeki veya görseldeki bilgileri kullanarak çoktan seçmeli sorular üret."
    } else {
        "Belirlediğim konu hakkında sorular üret."
    };
    let prompt = request
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("Kaliteli ve seviyeye uygun sorular üret.");

    format!(
        "Sen uzman bir öğretmensin. {source}\n\
         Dil: Türkçe. Her soru tam olarak 4 şıklı olmalıdır. Doğru cevabın indexini (0-3 arası) mutlaka belirt.\n\
         Talimat: {prompt}"
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Draft {
    text: String,
    options: Vec<String>,
    correct_answer_index: i64,
}

/// Turns the model's JSON text into questions. Items that are not exactly
/// four options with an in-range answer are dropped.
pub fn parse_generated(raw: &str) -> Result<Vec<Question>, AppError> {
    let drafts: Vec<Value> = serde_json::from_str(raw.trim())
        .map_err(|e| AppError::ServiceUnavailable(format!("Generator returned invalid JSON: {}", e)))?;

    let mut questions = Vec::with_capacity(drafts.len());
    for value in drafts {
        let Ok(draft) = serde_json::from_value::<Draft>(value) else {
            tracing::warn!("Dropping generated item with unexpected shape");
            continue;
        };
        let in_range = usize::try_from(draft.correct_answer_index)
            .ok()
            .filter(|i| *i < OPTIONS_PER_QUESTION);
        let Some(correct_answer_index) = in_range else {
            tracing::warn!("Dropping generated question with answer index {}", draft.correct_answer_index);
            continue;
        };
        if draft.options.len() != OPTIONS_PER_QUESTION || draft.text.trim().is_empty() {
            tracing::warn!("Dropping generated question with {} options", draft.options.len());
            continue;
        }
        questions.push(Question {
            id: uuid::Uuid::new_v4().to_string(),
            text: draft.text.trim().to_string(),
            options: draft.options,
            correct_answer_index,
            image_url: None,
            option_images: Some(vec![None; OPTIONS_PER_QUESTION]),
        });
    }
    Ok(questions)
}

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AppError> {
        let Some(api_key) = config.gemini_api_key.clone() else {
            return Ok(None);
        };
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::InternalServerError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Some(Self {
            client,
            api_key,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
        }))
    }

    fn payload(request: &GenerateRequest) -> Value {
        let mut parts = vec![json!({ "text": instructions(request) })];
        if let Some(file) = &request.attachment {
            parts.push(json!({
                "inlineData": { "data": file.data, "mimeType": file.mime_type }
            }));
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "text": { "type": "STRING" },
                            "options": {
                                "type": "ARRAY",
                                "items": { "type": "STRING" },
                                "minItems": 4,
                                "maxItems": 4
                            },
                            "correctAnswerIndex": { "type": "INTEGER" }
                        },
                        "required": ["text", "options", "correctAnswerIndex"]
                    }
                }
            }
        })
    }
}

#[async_trait]
impl QuestionGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<Vec<Question>, AppError> {
        let timer = Instant::now();
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::info!(model = %self.model, with_attachment = request.attachment.is_some(), "Sending question generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::payload(request))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            tracing::error!(%status, "Question generation failed: {}", body);
            return Err(AppError::ServiceUnavailable(
                "Question generation failed. Please try again.".to_string(),
            ));
        }

        let text = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("[]");

        let questions = parse_generated(text)?;
        tracing::info!(
            count = questions.len(),
            duration_seconds = timer.elapsed().as_secs_f64(),
            "Question generation completed"
        );
        Ok(questions)
    }
}
