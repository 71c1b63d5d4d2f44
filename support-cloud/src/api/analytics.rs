//! GET /api/analytics: dashboard numbers for a date window

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::util::now_millis;

use crate::api::ApiResult;
use crate::services::analytics::{self, AnalyticsSummary};
use crate::state::AppState;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;
const DEFAULT_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// Unix millis or `YYYY-MM-DD` (inclusive)
    pub from: Option<String>,
    /// Unix millis (exclusive) or `YYYY-MM-DD` (inclusive day)
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub from: i64,
    pub to: i64,
    #[serde(flatten)]
    pub summary: AnalyticsSummary,
}

enum Bound {
    Millis(i64),
    Day(i64),
}

fn parse_bound(value: &str, field: &str) -> Result<Bound, AppError> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(Bound::Millis(millis));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| Bound::Day(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()))
        .map_err(|_| {
            AppError::validation(format!("Invalid {field}: expected YYYY-MM-DD or Unix millis"))
                .with_detail("field", field.to_string())
        })
}

fn out_of_range(field: &str) -> AppError {
    AppError::with_message(ErrorCode::ValueOutOfRange, format!("`{field}` is out of range"))
        .with_detail("field", field.to_string())
}

/// Resolve the `[from, to)` window; defaults to the last 30 days.
pub fn window(query: &AnalyticsQuery, now: i64) -> Result<(i64, i64), AppError> {
    let to = match query.to.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match parse_bound(raw, "to")? {
            Bound::Millis(ms) => ms,
            Bound::Day(start) => start
                .checked_add(DAY_MILLIS)
                .ok_or_else(|| out_of_range("to"))?,
        },
        None => now,
    };
    let from = match query.from.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => match parse_bound(raw, "from")? {
            Bound::Millis(ms) | Bound::Day(ms) => ms,
        },
        None => to
            .checked_sub(DEFAULT_WINDOW_DAYS * DAY_MILLIS)
            .ok_or_else(|| out_of_range("to"))?,
    };
    if from >= to {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            "`from` must be before `to`",
        ));
    }
    Ok((from, to))
}

pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<AnalyticsResponse> {
    let now = now_millis();
    let (from, to) = window(&query, now)?;

    let tickets = state
        .store
        .tickets_created_between(from, to, None)
        .await
        .map_err(|e| {
            tracing::error!("Analytics ticket query error: {e}");
            AppError::new(ErrorCode::DatabaseError)
        })?;
    let sla = state.store.list_sla_targets().await.map_err(|e| {
        tracing::error!("SLA query error: {e}");
        AppError::new(ErrorCode::DatabaseError)
    })?;

    Ok(Json(AnalyticsResponse {
        from,
        to,
        summary: analytics::summarize(&tickets, &sla, now),
    }))
}
