// src/handlers/exams.rs

use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    generator::GenerateRequest,
    models::exam::{Exam, ExamStatus, ExamSummary, SaveExamRequest, UpdateExamStatusRequest},
    share::{SHARE_PARAM, share_link},
    state::AppState,
    store::ExamStore,
    utils::now_millis,
};

async fn load_exam(store: &dyn ExamStore, id: &str) -> Result<Exam, AppError> {
    store
        .find_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Lists all exams with their participant counts, newest first.
/// Teacher only.
pub async fn list_exams(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    let exams = store.get_exams().await?;
    let results = store.get_results().await?;

    let mut participants: HashMap<&str, usize> = HashMap::new();
    for r in &results {
        *participants.entry(r.exam_id.as_str()).or_default() += 1;
    }

    let mut summaries: Vec<ExamSummary> = exams
        .iter()
        .map(|e| ExamSummary {
            id: e.id.clone(),
            title: e.title.clone(),
            question_count: e.questions.len(),
            duration_minutes: e.duration_minutes,
            pass_percentage: e.pass_percentage,
            target_classes: e.target_classes.clone(),
            status: e.status,
            created_at: e.created_at,
            participant_count: participants.get(e.id.as_str()).copied().unwrap_or(0),
        })
        .collect();
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(summaries))
}

/// Creates an exam, or updates it in place when `id` names an existing one.
///
/// Duration is recomputed from the question count on every save; whatever
/// the client sends for it is ignored.
/// Teacher only.
pub async fn save_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Json(payload): Json<SaveExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let target_classes: Vec<String> = payload
        .target_classes
        .iter()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect();
    if target_classes.is_empty() {
        return Err(AppError::BadRequest(
            "Assign the exam to at least one class.".to_string(),
        ));
    }
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Please enter an exam title.".to_string()));
    }

    let existing = match payload.id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => store.find_exam(id).await?,
        None => None,
    };
    let created = existing.is_none();

    let questions: Vec<_> = payload
        .questions
        .into_iter()
        .map(|q| q.into_question())
        .collect();

    let exam = Exam {
        id: existing
            .as_ref()
            .map(|e| e.id.clone())
            .or(payload.id.filter(|id| !id.trim().is_empty()))
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        title,
        pass_percentage: payload.pass_percentage.unwrap_or(50),
        difficulty_points: payload
            .difficulty_points
            .unwrap_or(crate::config::DEFAULT_DIFFICULTY_POINTS),
        duration_minutes: Exam::derived_duration(questions.len()),
        questions,
        target_classes,
        created_at: existing.as_ref().map(|e| e.created_at).unwrap_or_else(now_millis),
        status: payload
            .status
            .or(existing.as_ref().map(|e| e.status))
            .unwrap_or_default(),
    };

    store.save_exam(exam.clone()).await?;
    tracing::info!(
        "{} exam '{}' ({} questions)",
        if created { "Created" } else { "Updated" },
        exam.title,
        exam.questions.len()
    );

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(exam)))
}

/// Full exam document, answer key included.
/// Teacher only.
pub async fn get_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_exam(store.as_ref(), &id).await?))
}

/// Deletes an exam. Results already submitted for it are kept.
/// Teacher only.
pub async fn delete_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_exam(&id).await?;
    tracing::info!("Deleted exam {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Archives or re-activates an exam.
/// Teacher only.
pub async fn update_exam_status(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateExamStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut exam = load_exam(store.as_ref(), &id).await?;
    exam.status = payload.status;
    store.save_exam(exam.clone()).await?;
    tracing::info!(
        "Exam '{}' is now {}",
        exam.title,
        if exam.status == ExamStatus::Active { "active" } else { "archived" }
    );
    Ok(Json(exam))
}

/// Share link for an exam.
/// Teacher only.
pub async fn share_exam(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(state.store.as_ref(), &id).await?;
    let link = share_link(&state.config.public_url, &exam)?;
    Ok(Json(json!({ "link": link })))
}

#[derive(Debug, Deserialize)]
pub struct ImportExamRequest {
    pub payload: String,
}

/// Imports an exam from a share-link payload.
/// Teacher only.
pub async fn import_exam(
    State(store): State<Arc<dyn ExamStore>>,
    Json(req): Json<ImportExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    match store.import_exam_from_link(&req.payload).await? {
        Some(title) => Ok((StatusCode::CREATED, Json(json!({ "imported": true, "title": title })))),
        None => Err(AppError::BadRequest(
            "The share link could not be read or does not hold a valid exam. Nothing was imported.".to_string(),
        )),
    }
}

/// Opening a share link: imports the exam named by the `importExam`
/// parameter, then redirects to the same URL without it so a reload does
/// not import twice.
/// Teacher only.
pub async fn import_exam_from_query(
    State(store): State<Arc<dyn ExamStore>>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(payload) = params.get(SHARE_PARAM) {
        if store.import_exam_from_link(payload).await?.is_none() {
            tracing::warn!("Ignoring unusable share link");
        }
    }

    let remaining: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().filter(|(k, _)| k.as_str() != SHARE_PARAM))
        .finish();
    let target = if remaining.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), remaining)
    };
    Ok(Redirect::to(&target))
}

/// Every question ever saved in an exam, de-duplicated by text.
/// Teacher only.
pub async fn question_pool(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.get_question_pool().await?))
}

/// Drafts questions with the AI generator. The result is not saved; the
/// client appends it to the exam being edited.
/// Teacher only.
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if req.is_empty() {
        return Err(AppError::BadRequest(
            "Enter a topic or attach a document".to_string(),
        ));
    }
    let generator = state.generator.as_ref().ok_or(AppError::ServiceUnavailable(
        "Question generation is not configured".to_string(),
    ))?;

    let questions = generator.generate(&req).await?;
    Ok(Json(questions))
}
