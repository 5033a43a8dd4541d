// src/utils/jwt.rs

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::Role, state::AppState};

/// JWT Claims structure. This is the session context handed to handlers:
/// who is acting and in which role.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user's document id.
    pub sub: String,
    pub role: Role,
    /// Token id, used for revocation on logout.
    pub jti: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Tokens revoked by logout, keyed by `jti` with the token's `exp`.
/// Checked by `auth_middleware`.
#[derive(Clone, Default)]
pub struct RevokedTokens(Arc<RwLock<HashMap<String, usize>>>);

impl RevokedTokens {
    /// Revokes a token until it would have expired anyway. Entries past
    /// that point are pruned on every call.
    pub fn revoke(&self, jti: &str, exp: usize) {
        self.revoke_at(jti, exp, unix_now());
    }

    fn revoke_at(&self, jti: &str, exp: usize, now: usize) {
        // Expired tokens still verify within the validation leeway.
        let leeway = Validation::default().leeway as usize;
        if let Ok(mut map) = self.0.write() {
            map.retain(|_, e| e.saturating_add(leeway) >= now);
            map.insert(jti.to_owned(), exp);
        }
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.0.read().map(|map| map.contains_key(jti)).unwrap_or(true)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.read().map(|map| map.len()).unwrap_or(0)
    }
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

/// Signs a new JWT for the user.
pub fn sign_jwt(
    id: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_owned(),
        role,
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and rejects revoked
/// tokens. If valid, injects `Claims` into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &state.config.jwt_secret) {
        Ok(claims) if !state.revoked.is_revoked(&claims.jti) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn require_role(req: &Request<Body>, role: Role) -> Result<(), StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if claims.role != role {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}

/// Axum Middleware: Teacher Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn teacher_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    require_role(&req, Role::Teacher)?;
    Ok(next.run(req).await)
}

/// Axum Middleware: Student Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn student_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    require_role(&req, Role::Student)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_round_trip_claims() {
        let token = sign_jwt("s-1", Role::Student, "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "s-1");
        assert_eq!(claims.role, Role::Student);
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn test_revocation() {
        let revoked = RevokedTokens::default();
        assert!(!revoked.is_revoked("abc"));
        revoked.revoke("abc", unix_now() + 3600);
        assert!(revoked.is_revoked("abc"));
    }

    #[test]
    fn test_revocation_prunes_expired_tokens() {
        let revoked = RevokedTokens::default();
        revoked.revoke_at("old", 1_000, 1_000);
        revoked.revoke_at("recent", 1_950, 1_050);
        assert_eq!(revoked.len(), 2);

        revoked.revoke_at("new", 9_000, 5_000);
        assert_eq!(revoked.len(), 1);
        assert!(revoked.is_revoked("new"));
        assert!(!revoked.is_revoked("old"));
        assert!(!revoked.is_revoked("recent"));
    }
}
