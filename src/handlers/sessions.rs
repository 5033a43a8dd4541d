// src/handlers/sessions.rs
//
// One live exam session per path id. Every call answers with the current
// snapshot so the client can redraw from it.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, session::SessionManager, utils::jwt::Claims};

pub async fn get_session(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.view(id, &claims.sub).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_id: String,
    /// `null` clears the answer.
    pub option_index: Option<usize>,
}

pub async fn answer(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = sessions
        .select_answer(id, &claims.sub, &req.question_id, req.option_index)
        .await?;
    Ok(Json(snapshot))
}

pub async fn next(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.next(id, &claims.sub).await?))
}

pub async fn previous(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.previous(id, &claims.sub).await?))
}

/// Opens the confirmation step. Only allowed on the last question.
pub async fn finish(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.request_finish(id, &claims.sub).await?))
}

/// Dismisses the confirmation step.
pub async fn cancel(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.cancel_finish(id, &claims.sub).await?))
}

/// Submits the exam. Calling it again after a failed save retries the save.
pub async fn confirm(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.confirm(id, &claims.sub).await?))
}

/// Leaves the summary screen.
pub async fn close(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sessions.close(id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Quits an unsubmitted exam. Answers are discarded.
pub async fn abandon(
    State(sessions): State<SessionManager>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sessions.abandon(id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
