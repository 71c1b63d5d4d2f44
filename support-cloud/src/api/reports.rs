//! GET /api/reports/company/{id}?year=YYYY

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Datelike;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use crate::api::ApiResult;
use crate::services::reports::{self, CompanyReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
}

pub async fn company_report(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<CompanyReport> {
    let year = query.year.unwrap_or_else(|| chrono::Utc::now().year());
    let (from, to) = reports::year_bounds(year).ok_or_else(|| {
        AppError::with_message(ErrorCode::ValueOutOfRange, format!("Invalid year {year}"))
    })?;

    let company = state
        .store
        .get_company(company_id)
        .await
        .map_err(|e| {
            tracing::error!("Company query error: {e}");
            AppError::new(ErrorCode::DatabaseError)
        })?
        .ok_or_else(|| AppError::new(ErrorCode::CompanyNotFound))?;

    let tickets = state
        .store
        .tickets_created_between(from, to, Some(company_id))
        .await
        .map_err(|e| {
            tracing::error!("Report ticket query error: {e}");
            AppError::new(ErrorCode::DatabaseError)
        })?;

    Ok(Json(reports::build(company, year, &tickets)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::store::SupportStore;
    use crate::testing::{TestHarness, body_json, sample_ticket};

    const MARCH_2026: i64 = 1_772_323_200_000;

    #[tokio::test]
    async fn test_report_covers_company_and_year() {
        let h = TestHarness::new();
        let acme = h.store.create_company("ACME", "acme.com").await.unwrap();
        let other = h.store.create_company("Globex", "globex.com").await.unwrap();

        let mut ticket = sample_ticket(1);
        ticket.company_id = Some(acme.id);
        ticket.created_at = MARCH_2026;
        h.store.insert_ticket(ticket);

        let mut foreign = sample_ticket(2);
        foreign.company_id = Some(other.id);
        foreign.created_at = MARCH_2026;
        h.store.insert_ticket(foreign);

        let mut last_year = sample_ticket(3);
        last_year.company_id = Some(acme.id);
        last_year.created_at = MARCH_2026 - 365 * 24 * 60 * 60 * 1000;
        h.store.insert_ticket(last_year);

        let res = h
            .router()
            .oneshot(
                Request::get(format!("/api/reports/company/{}?year=2026", acme.id))
                    .header("authorization", h.bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = body_json(res).await;
        assert_eq!(json["company"]["name"], "ACME");
        assert_eq!(json["total_tickets"], 1);
        assert_eq!(json["tickets_per_month"][2], 1);
        assert_eq!(json["tickets"][0]["ticket_id"], "TKT-0001");
    }

    #[tokio::test]
    async fn test_unknown_company_is_404() {
        let h = TestHarness::new();
        let res = h
            .router()
            .oneshot(
                Request::get(format!("/api/reports/company/{}", uuid::Uuid::new_v4()))
                    .header("authorization", h.bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
