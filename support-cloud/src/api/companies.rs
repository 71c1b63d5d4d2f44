//! GET /api/companies: filter dropdown source

use axum::{Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::support::Company;

use crate::api::ApiResult;
use crate::state::AppState;

pub async fn list_companies(State(state): State<AppState>) -> ApiResult<Vec<Company>> {
    let companies = state.store.list_companies().await.map_err(|e| {
        tracing::error!("Company list query error: {e}");
        AppError::new(ErrorCode::DatabaseError)
    })?;
    Ok(Json(companies))
}
