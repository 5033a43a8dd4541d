// src/handlers/reports.rs
//
// PDF downloads. Each handler gathers the analytics, builds a report and
// streams it back as an attachment.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    analytics::{class_rollup, exam_leaderboard, question_stats},
    error::AppError,
    models::exam::Exam,
    reports::{self, Report},
    store::ExamStore,
};

fn pdf_response(report: &Report) -> Result<impl IntoResponse + use<>, AppError> {
    let bytes = reports::render(report)?;
    let disposition = format!("attachment; filename=\"{}.pdf\"", report.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

async fn load_exam(store: &dyn ExamStore, id: &str) -> Result<Exam, AppError> {
    store
        .find_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

pub async fn exam_paper(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(store.as_ref(), &id).await?;
    pdf_response(&reports::exam_paper(&exam))
}

pub async fn exam_results(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(store.as_ref(), &id).await?;
    let results = store.results_for_exam(&exam.id).await?;
    let students = store.get_students().await?;
    let rows = exam_leaderboard(&exam, &results, &students);
    pdf_response(&reports::exam_results(&exam, &rows, Utc::now()))
}

pub async fn question_analysis(
    State(store): State<Arc<dyn ExamStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(store.as_ref(), &id).await?;
    let results = store.results_for_exam(&exam.id).await?;
    let stats = question_stats(&exam, &results);
    if stats.is_empty() {
        return Err(AppError::NotFound(
            "No results to analyse for this exam yet".to_string(),
        ));
    }
    pdf_response(&reports::question_analysis(&exam, &stats, Utc::now()))
}

pub async fn class_report(
    State(store): State<Arc<dyn ExamStore>>,
    Path(class_group): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.get_students().await?;
    let results = store.get_results().await?;
    let rollup = class_rollup(&class_group, &students, &results);
    if rollup.is_empty() {
        return Err(AppError::NotFound("No students in this class".to_string()));
    }
    pdf_response(&reports::class_report(&class_group, &rollup, Utc::now()))
}

pub async fn report_card(
    State(store): State<Arc<dyn ExamStore>>,
    Path(result_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = store
        .find_result(&result_id)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))?;
    let exam = load_exam(store.as_ref(), &result.exam_id).await?;
    let student = store.find_student_by_id(&result.student_id).await?;
    pdf_response(&reports::report_card(student.as_ref(), &exam, &result))
}
