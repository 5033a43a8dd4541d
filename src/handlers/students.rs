// src/handlers/students.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    analytics::class_groups,
    error::AppError,
    models::user::{PublicStudent, Role, SaveStudentRequest, Student},
    roster::{ImportReport, parse_roster},
    store::ExamStore,
    utils::{hash::hash_password, now_millis},
};

/// Lists all students, ordered by class then surname.
/// Teacher only.
pub async fn list_students(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    let mut students = store.get_students().await?;
    students.sort_by(|a, b| {
        (&a.class_group, &a.surname, &a.name).cmp(&(&b.class_group, &b.surname, &b.name))
    });
    let students: Vec<PublicStudent> = students.iter().map(PublicStudent::from).collect();
    Ok(Json(students))
}

/// Builds the stored document for a roster entry, keeping identity and the
/// current password of an existing student unless a new one is given.
fn build_student(
    existing: Option<Student>,
    school_no: &str,
    name: &str,
    surname: &str,
    class_group: &str,
    password: Option<&str>,
) -> Result<Student, AppError> {
    let password_hash = match (password, &existing) {
        (Some(p), _) => hash_password(p)?,
        (None, Some(s)) => s.password_hash.clone(),
        (None, None) => hash_password(school_no)?,
    };

    Ok(Student {
        id: existing
            .as_ref()
            .map(|s| s.id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        role: Role::Student,
        name: name.trim().to_string(),
        surname: surname.trim().to_string(),
        username: school_no.to_string(),
        school_no: school_no.to_string(),
        class_group: class_group.trim().to_uppercase(),
        password_hash,
        created_at: existing.map(|s| s.created_at).unwrap_or_else(now_millis),
    })
}

/// Creates a student, or updates the one with the same school number.
/// Teacher only.
pub async fn save_student(
    State(store): State<Arc<dyn ExamStore>>,
    Json(payload): Json<SaveStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let school_no = payload.school_no.trim();
    let existing = store.find_student_by_school_no(school_no).await?;
    let created = existing.is_none();

    let student = build_student(
        existing,
        school_no,
        &payload.name,
        &payload.surname,
        &payload.class_group,
        payload.password.as_deref(),
    )?;
    let body = PublicStudent::from(&student);
    store.save_student(student).await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(body)))
}

/// Deletes a student by school number. Their results stay as audit records.
/// Teacher only.
pub async fn delete_student(
    State(store): State<Arc<dyn ExamStore>>,
    Path(school_no): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_student(&school_no).await?;
    tracing::info!("Deleted student {}", school_no);
    Ok(StatusCode::NO_CONTENT)
}

/// Imports a CSV roster sent as the raw request body.
///
/// Best effort: malformed lines are skipped and listed in the report, the
/// rest are upserted.
/// Teacher only.
pub async fn import_students(
    State(store): State<Arc<dyn ExamStore>>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("The roster file is empty".to_string()));
    }

    let parsed = parse_roster(&body);
    let mut imported = 0;
    for row in parsed.rows {
        let existing = store.find_student_by_school_no(&row.school_no).await?;
        let student = build_student(
            existing,
            &row.school_no,
            &row.name,
            &row.surname,
            &row.class_group,
            Some(&row.password),
        )?;
        store.save_student(student).await?;
        imported += 1;
    }

    tracing::info!(
        "Roster import: {} imported, {} skipped",
        imported,
        parsed.skipped.len()
    );
    Ok(Json(ImportReport {
        imported,
        skipped: parsed.skipped,
    }))
}

/// Distinct class groups of the roster.
/// Teacher only.
pub async fn list_classes(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.get_students().await?;
    Ok(Json(class_groups(&students)))
}
