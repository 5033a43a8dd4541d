// src/handlers/student.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::{
    analytics::{StudentProgress, student_progress},
    error::AppError,
    models::{exam::ExamCard, user::Student},
    state::AppState,
    store::ExamStore,
    utils::jwt::Claims,
};

pub(crate) async fn current_student(store: &dyn ExamStore, claims: &Claims) -> Result<Student, AppError> {
    store
        .find_student_by_id(&claims.sub)
        .await?
        .ok_or(AppError::AuthError("Account no longer exists".to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub progress: StudentProgress,
    pub exams: Vec<ExamCard>,
}

/// The student's home screen: XP, rank and the exams open to their class.
/// Student only.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = current_student(state.store.as_ref(), &claims).await?;
    let exams = state.store.get_exams().await?;
    let results = state.store.results_for_student(&student.id).await?;

    let completed: HashSet<&str> = results.iter().map(|r| r.exam_id.as_str()).collect();
    let cards = exams
        .iter()
        .filter(|e| e.is_visible_to(&student.class_group))
        .map(|e| ExamCard {
            id: e.id.clone(),
            title: e.title.clone(),
            question_count: e.questions.len(),
            duration_minutes: e.duration_minutes,
            max_points: e.max_points(),
            completed: completed.contains(e.id.as_str()),
        })
        .collect();

    Ok(Json(Dashboard {
        progress: student_progress(&student, &results, &exams),
        exams: cards,
    }))
}

/// Starts an exam, or re-enters the session already running for it.
/// Student only.
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let student = current_student(state.store.as_ref(), &claims).await?;
    let snapshot = state.sessions.start(&exam_id, &student).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}
