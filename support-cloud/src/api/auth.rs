//! POST /api/auth/login: staff console sign-in

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::api::ApiResult;
use crate::auth::staff_auth;
use crate::state::AppState;
use crate::util::verify_password;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StaffSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub staff: StaffSummary,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let email = req.email.trim().to_lowercase();
    let staff = state
        .store
        .find_staff_by_email(&email)
        .await
        .map_err(|e| {
            tracing::error!("DB error during login: {e}");
            AppError::new(ErrorCode::InternalError)
        })?
        .ok_or_else(AppError::invalid_credentials)?;

    if !verify_password(&req.password, &staff.hashed_password) {
        tracing::warn!(email = %email, "Staff login failed");
        return Err(AppError::invalid_credentials());
    }

    if !staff.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let token = staff_auth::create_token(staff.id, &staff.email, &staff.name, &state.jwt_secret)
        .map_err(|e| {
            tracing::error!("JWT creation failed: {e}");
            AppError::new(ErrorCode::InternalError)
        })?;

    tracing::info!(staff_id = %staff.id, "Staff signed in");

    Ok(Json(LoginResponse {
        token,
        staff: StaffSummary {
            id: staff.id,
            email: staff.email,
            name: staff.name,
            role: staff.role,
        },
    }))
}
