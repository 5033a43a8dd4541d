// src/handlers/analytics.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    analytics::{class_rollup, exam_leaderboard, overview, question_stats, student_progress},
    error::AppError,
    store::ExamStore,
};

/// Headline counts for the teacher dashboard.
pub async fn get_overview(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.get_students().await?;
    let exams = store.get_exams().await?;
    let results = store.get_results().await?;
    Ok(Json(overview(&students, &exams, &results)))
}

pub async fn exam_questions(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = store
        .find_exam(&id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;
    let results = store.results_for_exam(&exam.id).await?;
    Ok(Json(question_stats(&exam, &results)))
}

pub async fn exam_results(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = store
        .find_exam(&id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;
    let results = store.results_for_exam(&exam.id).await?;
    let students = store.get_students().await?;
    Ok(Json(exam_leaderboard(&exam, &results, &students)))
}

pub async fn class_summary(
    State(store): State<Arc<dyn ExamStore>>,
    Path(class_group): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.get_students().await?;
    let results = store.get_results().await?;
    Ok(Json(class_rollup(&class_group, &students, &results)))
}

pub async fn student_summary(
    State(store): State<Arc<dyn ExamStore>>,
    Path(school_no): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let student = store
        .find_student_by_school_no(&school_no)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;
    let results = store.results_for_student(&student.id).await?;
    let exams = store.get_exams().await?;
    Ok(Json(student_progress(&student, &results, &exams)))
}
