// src/share.rs
//
// Exam share links: the exam document as JSON, base64 encoded, carried in
// the `importExam` query parameter of the application URL.

use base64::{Engine, engine::general_purpose::STANDARD};
use url::Url;

use crate::{error::AppError, models::exam::Exam};

pub const SHARE_PARAM: &str = "importExam";

#[derive(Debug)]
pub enum ShareError {
    Base64(base64::DecodeError),
    Utf8(std::string::FromUtf8Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ShareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShareError::Base64(e) => write!(f, "payload is not base64: {}", e),
            ShareError::Utf8(e) => write!(f, "payload is not UTF-8: {}", e),
            ShareError::Json(e) => write!(f, "payload is not an exam document: {}", e),
        }
    }
}

impl std::error::Error for ShareError {}

pub fn encode_exam(exam: &Exam) -> Result<String, AppError> {
    let json = serde_json::to_string(exam)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decodes a share payload. Accepts the padding-less and URL-safe variants
/// some clients produce when copying links by hand.
pub fn decode_exam(payload: &str) -> Result<Exam, ShareError> {
    let cleaned: String = payload
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    let padded = match cleaned.len() % 4 {
        2 => format!("{cleaned}=="),
        3 => format!("{cleaned}="),
        _ => cleaned,
    };

    let bytes = STANDARD.decode(padded.as_bytes()).map_err(ShareError::Base64)?;
    let json = String::from_utf8(bytes).map_err(ShareError::Utf8)?;
    serde_json::from_str(&json).map_err(ShareError::Json)
}

/// Builds the link a teacher sends around: `<public_url>/?importExam=<payload>`.
pub fn share_link(public_url: &str, exam: &Exam) -> Result<String, AppError> {
    let mut url = Url::parse(public_url)
        .map_err(|e| AppError::InternalServerError(format!("Invalid PUBLIC_URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair(SHARE_PARAM, &encode_exam(exam)?);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Exam {
        serde_json::from_str(
            r#"{"id":"e1","title":"Kesirler","passPercentage":60,
                "questions":[{"id":"q1","text":"1/2 + 1/2 = ?",
                "options":["1","2","0","1/4"],"correctAnswerIndex":0}],
                "targetClasses":["5A"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_decode_accepts_encoded_exam() {
        let exam = sample();
        let decoded = decode_exam(&encode_exam(&exam).unwrap()).unwrap();
        assert_eq!(decoded, exam);
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let payload = STANDARD.encode("definitely not json");
        assert!(matches!(decode_exam(&payload), Err(ShareError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_exam("%%%"), Err(ShareError::Base64(_))));
    }

    #[test]
    fn test_share_link_carries_payload() {
        let link = share_link("http://school.local/app", &sample()).unwrap();
        let url = Url::parse(&link).unwrap();
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, SHARE_PARAM);
        assert_eq!(decode_exam(&value).unwrap().title, "Kesirler");
    }
}
