//! SLA settings
//!
//! GET/PUT /api/settings/sla

use std::collections::HashSet;

use axum::{Extension, Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::support::SlaTarget;

use crate::api::ApiResult;
use crate::auth::StaffIdentity;
use crate::state::AppState;

pub async fn get_sla(State(state): State<AppState>) -> ApiResult<Vec<SlaTarget>> {
    let targets = state.store.list_sla_targets().await.map_err(|e| {
        tracing::error!("SLA query error: {e}");
        AppError::new(ErrorCode::DatabaseError)
    })?;
    Ok(Json(targets))
}

/// Reject empty lists, duplicate tiers and out-of-range hours
pub fn validate_targets(targets: &[SlaTarget]) -> Result<(), AppError> {
    if targets.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::InvalidSlaTarget,
            "At least one SLA target is required",
        ));
    }
    let mut seen = HashSet::new();
    for target in targets {
        let priority = target.priority.as_db();
        if !seen.insert(target.priority) {
            return Err(AppError::with_message(
                ErrorCode::InvalidSlaTarget,
                "Duplicate priority in SLA targets",
            )
            .with_detail("priority", priority));
        }
        target.validate().map_err(|msg| {
            AppError::with_message(ErrorCode::InvalidSlaTarget, msg).with_detail("priority", priority)
        })?;
    }
    Ok(())
}

pub async fn update_sla(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    Json(targets): Json<Vec<SlaTarget>>,
) -> ApiResult<Vec<SlaTarget>> {
    validate_targets(&targets)?;

    state.store.upsert_sla_targets(&targets).await.map_err(|e| {
        tracing::error!("SLA update error: {e}");
        AppError::new(ErrorCode::DatabaseError)
    })?;
    tracing::info!(staff_id = %identity.staff_id, tiers = targets.len(), "SLA targets updated");

    get_sla(State(state)).await
}
