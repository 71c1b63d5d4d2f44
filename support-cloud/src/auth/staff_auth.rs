//! Staff JWT authentication for the admin API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::state::AppState;

/// JWT claims for a staff session
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Staff profile id
    pub sub: String,
    pub email: String,
    pub name: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated staff member, inserted as a request extension
#[derive(Debug, Clone)]
pub struct StaffIdentity {
    pub staff_id: Uuid,
    pub email: String,
    pub name: String,
}

const JWT_EXPIRY_HOURS: i64 = 24;

pub fn create_token(
    staff_id: Uuid,
    email: &str,
    name: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = StaffClaims {
        sub: staff_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, secret: &str) -> Result<StaffIdentity, AppError> {
    let token_data = jsonwebtoken::decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired)
            }
            _ => AppError::invalid_token("Invalid or expired token"),
        }
    })?;

    let staff_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::invalid_token("Invalid token subject"))?;

    Ok(StaffIdentity {
        staff_id,
        email: token_data.claims.email,
        name: token_data.claims.name,
    })
}

/// Verifies `Authorization: Bearer <jwt>` and inserts [`StaffIdentity`]
pub async fn staff_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::not_authenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))?;

    let identity = decode_token(token, &state.jwt_secret)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
