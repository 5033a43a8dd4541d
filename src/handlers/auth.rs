// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, Role, SessionUser},
    state::AppState,
    store::ExamStore,
    utils::{
        hash::verify_password,
        jwt::{Claims, sign_jwt},
    },
};

/// Authenticates a student (by school number) or the teacher (by username)
/// and returns a JWT token plus the session user.
pub async fn login(
    State(store): State<Arc<dyn ExamStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let identifier = payload.identifier.trim();

    let (user, password_hash) = match payload.role {
        Role::Teacher => {
            let teacher = store.get_teacher().await?;
            if teacher.username != identifier {
                return Err(AppError::AuthError("Invalid username or password".to_string()));
            }
            (SessionUser::from(&teacher), teacher.password_hash)
        }
        Role::Student => {
            let student = store
                .find_student_by_school_no(identifier)
                .await?
                .ok_or(AppError::AuthError("Student not found".to_string()))?;
            (SessionUser::from(&student), student.password_hash)
        }
    };

    if !verify_password(&payload.password, &password_hash)? {
        tracing::warn!("Failed login for {} {}", payload.role.as_str(), identifier);
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(&user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!("{} {} logged in", user.role.as_str(), user.username);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}

/// Loads the session context for the bearer of the token.
pub async fn me(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = match claims.role {
        Role::Teacher => SessionUser::from(&store.get_teacher().await?),
        Role::Student => {
            let student = store
                .find_student_by_id(&claims.sub)
                .await?
                .ok_or(AppError::AuthError("Account no longer exists".to_string()))?;
            SessionUser::from(&student)
        }
    };
    Ok(Json(user))
}

/// Clears the session: revokes the token and drops any live exam sessions.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    state.revoked.revoke(&claims.jti, claims.exp);
    if claims.role == Role::Student {
        let dropped = state.sessions.abandon_for_student(&claims.sub).await;
        if dropped > 0 {
            tracing::info!("Abandoned {} exam session(s) on logout", dropped);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
