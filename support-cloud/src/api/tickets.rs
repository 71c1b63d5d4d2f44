//! Ticket API endpoints
//!
//! - POST /api/tickets: public website form (rate-limited)
//! - GET/PATCH /api/tickets/{id} and the list: staff console
//! - POST /api/tickets/{id}/messages: staff reply or internal note

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Deserializer, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::support::{
    AttachmentRef, Message, Ticket, TicketPriority, TicketStatus, parse_ticket_ref,
};
use uuid::Uuid;

use crate::api::ApiResult;
use crate::auth::StaffIdentity;
use crate::inbound::address::email_domain;
use crate::services::tickets::{
    self as ticket_service, AgentReply, TicketDetail, TicketSubmission, TicketUpdate,
};
use crate::state::AppState;
use crate::store::TicketFilter;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

// ── Public form ──

#[derive(Debug, Default, Deserialize)]
pub struct CreateTicketRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub product: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketRef {
    pub id: Uuid,
    pub ticket_number: i64,
    pub ticket_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub success: bool,
    pub ticket: TicketRef,
    pub email_sent: bool,
}

/// Trimmed, non-empty value of an optional text field
fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateTicketRequest {
    fn into_submission(self) -> Result<TicketSubmission, AppError> {
        let email = filled(self.email);
        let subject = filled(self.subject);
        let message = filled(self.message);
        let product = filled(self.product);
        let issue_type = filled(self.issue_type);

        let missing: Vec<&str> = [
            ("email", email.is_none()),
            ("subject", subject.is_none()),
            ("message", message.is_none()),
            ("product", product.is_none()),
            ("issue_type", issue_type.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        let (Some(email), Some(subject), Some(message), Some(product), Some(issue_type)) =
            (email, subject, message, product, issue_type)
        else {
            return Err(AppError::missing_fields(&missing));
        };

        if email_domain(&email).is_none() {
            return Err(AppError::validation("Invalid email address").with_detail("field", "email"));
        }

        let priority = match filled(self.priority) {
            Some(p) => parse_priority(&p)?,
            None => TicketPriority::default(),
        };

        Ok(TicketSubmission {
            email,
            name: filled(self.name),
            phone: filled(self.phone),
            company: filled(self.company),
            subject,
            message,
            product,
            issue_type,
            priority,
        })
    }
}

fn parse_status(value: &str) -> Result<TicketStatus, AppError> {
    TicketStatus::from_db(value).ok_or_else(|| {
        AppError::new(ErrorCode::InvalidTicketStatus).with_detail("status", value.to_string())
    })
}

fn parse_priority(value: &str) -> Result<TicketPriority, AppError> {
    TicketPriority::from_db(value).ok_or_else(|| {
        AppError::new(ErrorCode::InvalidTicketPriority).with_detail("priority", value.to_string())
    })
}

/// POST /api/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<CreateTicketResponse> {
    let submission = req.into_submission()?;
    let created = ticket_service::submit_web_ticket(&state, submission).await?;

    Ok(Json(CreateTicketResponse {
        success: true,
        ticket: TicketRef {
            id: created.ticket.id,
            ticket_number: created.ticket.ticket_number,
            ticket_id: created.ticket.display_id(),
        },
        email_sent: created.email_sent,
    }))
}

// ── Staff console ──

#[derive(Debug, Default, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub product: Option<String>,
    pub issue_type: Option<String>,
    pub company_id: Option<String>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TicketListItem {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub display_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<TicketListItem>,
    pub pagination: Pagination,
}

/// Dropdown filters send `""` or `"all"` for "no filter"
fn selected(value: Option<String>) -> Option<String> {
    filled(value).filter(|v| !v.eq_ignore_ascii_case("all"))
}

fn parse_uuid(value: Option<String>, field: &str) -> Result<Option<Uuid>, AppError> {
    selected(value)
        .map(|v| {
            Uuid::parse_str(&v).map_err(|_| {
                AppError::validation(format!("Invalid {field}")).with_detail("field", field)
            })
        })
        .transpose()
}

/// Clamp page/limit: page ≥ 1, limit in 1..=100 (default 20)
pub fn page_bounds(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

/// Rows to skip for `page`; pages past the `i64` range are rejected.
fn page_offset(page: i64, limit: i64) -> Result<i64, AppError> {
    (page - 1).checked_mul(limit).ok_or_else(|| {
        AppError::with_message(ErrorCode::ValueOutOfRange, "page is out of range")
            .with_detail("field", "page")
    })
}

impl ListTicketsQuery {
    fn into_filter(self) -> Result<(TicketFilter, i64, i64), AppError> {
        let (page, limit) = page_bounds(self.page, self.limit);
        let search = filled(self.search);
        let filter = TicketFilter {
            status: selected(self.status).map(|s| parse_status(&s)).transpose()?,
            priority: selected(self.priority)
                .map(|p| parse_priority(&p))
                .transpose()?,
            product: selected(self.product),
            issue_type: selected(self.issue_type),
            company_id: parse_uuid(self.company_id, "company_id")?,
            assigned_to: parse_uuid(self.assigned_to, "assigned_to")?,
            ticket_number: search.as_deref().and_then(parse_ticket_ref),
            search,
            limit,
            offset: page_offset(page, limit)?,
        };
        Ok((filter, page, limit))
    }
}

/// GET /api/tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<TicketListResponse> {
    let (filter, page, limit) = query.into_filter()?;
    let result = state.store.list_tickets(&filter).await.map_err(|e| {
        tracing::error!("Ticket list query error: {e}");
        AppError::new(ErrorCode::DatabaseError)
    })?;

    let tickets = result
        .tickets
        .into_iter()
        .map(|ticket| TicketListItem {
            display_id: ticket.display_id(),
            ticket,
        })
        .collect();

    Ok(Json(TicketListResponse {
        tickets,
        pagination: Pagination::new(page, limit, result.total),
    }))
}

/// GET /api/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TicketDetail> {
    Ok(Json(ticket_service::ticket_detail(&state, id).await?))
}

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTicketRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
    pub product: Option<String>,
    pub issue_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTicketResponse {
    pub success: bool,
    pub ticket: Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_email_sent: Option<bool>,
}

/// PATCH /api/tickets/{id}
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTicketRequest>,
) -> ApiResult<UpdateTicketResponse> {
    let update = TicketUpdate {
        status: req.status.as_deref().map(parse_status).transpose()?,
        priority: req.priority.as_deref().map(parse_priority).transpose()?,
        assigned_to: req.assigned_to,
        product: req.product,
        issue_type: req.issue_type,
    };

    let updated = ticket_service::update_ticket(&state, id, update).await?;
    tracing::debug!(ticket_id = %id, staff_id = %identity.staff_id, "Ticket updated");

    Ok(Json(UpdateTicketResponse {
        success: true,
        ticket: updated.ticket,
        resolution_email_sent: updated.resolution_email_sent,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Serialize)]
pub struct AddMessageResponse {
    pub success: bool,
    pub message: Message,
    /// `false` when the customer email failed; absent for internal notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
}

/// POST /api/tickets/{id}/messages
pub async fn add_message(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMessageRequest>,
) -> ApiResult<AddMessageResponse> {
    let posted = ticket_service::add_agent_message(
        &state,
        id,
        &identity,
        AgentReply {
            content: req.content,
            is_internal: req.is_internal,
            attachments: req.attachments,
        },
    )
    .await?;

    Ok(Json(AddMessageResponse {
        success: true,
        message: posted.message,
        email_sent: posted.email_sent,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::store::SupportStore;
    use crate::testing::{TestHarness, body_json, sample_ticket};

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn staff_request(
        h: &TestHarness,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", h.bearer());
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn form() -> serde_json::Value {
        serde_json::json!({
            "email": "jane@acme.com",
            "name": "Jane Doe",
            "company": "ACME",
            "subject": "Press line stopped",
            "message": "Line 2 is down since 6am",
            "product": "mes",
            "issue_type": "outage",
        })
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(None, None), (1, 20));
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1));
        assert_eq!(page_bounds(Some(-3), Some(500)), (1, 100));
        assert_eq!(page_bounds(Some(4), Some(50)), (4, 50));
    }

    #[test]
    fn test_page_offset_rejects_overflow() {
        assert_eq!(page_offset(3, 20).unwrap(), 40);
        let err = page_offset(i64::MAX, 20).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).total_pages, 2);
    }

    #[test]
    fn test_search_by_ticket_reference_sets_number() {
        let query = ListTicketsQuery {
            search: Some(" TKT-0042 ".into()),
            status: Some("all".into()),
            ..Default::default()
        };
        let (filter, _, _) = query.into_filter().unwrap();
        assert_eq!(filter.ticket_number, Some(42));
        assert_eq!(filter.search.as_deref(), Some("TKT-0042"));
        assert_eq!(filter.status, None);
    }

    #[test]
    fn test_missing_fields_listed() {
        let req = CreateTicketRequest {
            email: Some("jane@acme.com".into()),
            subject: Some("  ".into()),
            ..Default::default()
        };
        let err = req.into_submission().unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        let fields = &err.details.unwrap()["fields"];
        assert_eq!(
            fields,
            &serde_json::json!(["subject", "message", "product", "issue_type"])
        );
    }

    #[tokio::test]
    async fn test_public_form_creates_ticket() {
        let h = TestHarness::new();
        let res = h
            .router()
            .oneshot(json_request("POST", "/api/tickets", form()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let json = body_json(res).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["ticket"]["ticket_number"], 1);
        assert_eq!(json["ticket"]["ticket_id"], "TKT-0001");
        assert_eq!(json["email_sent"], true);
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_public_form_missing_fields_is_400() {
        let h = TestHarness::new();
        let res = h
            .router()
            .oneshot(json_request(
                "POST",
                "/api/tickets",
                serde_json::json!({"email": "jane@acme.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.store.ticket_count(), 0);
    }

    #[tokio::test]
    async fn test_public_form_mail_failure_still_creates() {
        let h = TestHarness::new();
        h.mailer.fail(true);
        let res = h
            .router()
            .oneshot(json_request("POST", "/api/tickets", form()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["email_sent"], false);
        assert_eq!(h.store.ticket_count(), 1);
    }

    #[tokio::test]
    async fn test_public_form_is_rate_limited() {
        let h = TestHarness::new();
        let router = h.router();
        for _ in 0..5 {
            let res = router
                .clone()
                .oneshot(json_request("POST", "/api/tickets", form()))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = router
            .oneshot(json_request("POST", "/api/tickets", form()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_list_requires_staff_token() {
        let h = TestHarness::new();
        let res = h
            .router()
            .oneshot(Request::get("/api/tickets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_paginates_and_filters() {
        let h = TestHarness::new();
        for n in 1..=25 {
            let mut ticket = sample_ticket(n);
            ticket.created_at = n * 1000;
            if n % 5 == 0 {
                ticket.status = TicketStatus::Resolved;
            }
            h.store.insert_ticket(ticket);
        }

        let res = h
            .router()
            .oneshot(staff_request(&h, "GET", "/api/tickets?page=2&limit=10", None))
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["tickets"].as_array().unwrap().len(), 10);
        assert_eq!(json["tickets"][0]["ticket_number"], 15);
        assert_eq!(json["tickets"][0]["display_id"], "TKT-0015");
        assert_eq!(
            json["pagination"],
            serde_json::json!({"page": 2, "limit": 10, "total": 25, "total_pages": 3})
        );

        let res = h
            .router()
            .oneshot(staff_request(&h, "GET", "/api/tickets?status=resolved", None))
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["pagination"]["total"], 5);
    }

    #[tokio::test]
    async fn test_list_huge_page_is_400() {
        let h = TestHarness::new();
        h.store.insert_ticket(sample_ticket(1));
        let res = h
            .router()
            .oneshot(staff_request(
                &h,
                "GET",
                "/api/tickets?page=9223372036854775807",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status() {
        let h = TestHarness::new();
        let res = h
            .router()
            .oneshot(staff_request(&h, "GET", "/api/tickets?status=bogus", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_matches_ticket_number() {
        let h = TestHarness::new();
        h.store.insert_ticket(sample_ticket(7));
        let mut other = sample_ticket(8);
        other.subject = "Label printer offline".into();
        h.store.insert_ticket(other);

        let res = h
            .router()
            .oneshot(staff_request(&h, "GET", "/api/tickets?search=TKT-0008", None))
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["pagination"]["total"], 1);
        assert_eq!(json["tickets"][0]["subject"], "Label printer offline");
    }

    #[tokio::test]
    async fn test_detail_includes_internal_messages() {
        let h = TestHarness::new();
        let ticket = sample_ticket(1);
        let id = ticket.id;
        h.store.insert_ticket(ticket);
        let router = h.router();

        router
            .clone()
            .oneshot(staff_request(
                &h,
                "POST",
                &format!("/api/tickets/{id}/messages"),
                Some(serde_json::json!({"content": "Check firmware", "is_internal": true})),
            ))
            .await
            .unwrap();

        let res = router
            .oneshot(staff_request(&h, "GET", &format!("/api/tickets/{id}"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["display_id"], "TKT-0001");
        assert_eq!(json["messages"][0]["is_internal"], true);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_detail_unknown_ticket_is_404() {
        let h = TestHarness::new();
        let res = h
            .router()
            .oneshot(staff_request(
                &h,
                "GET",
                &format!("/api/tickets/{}", Uuid::new_v4()),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reply_emails_customer() {
        let h = TestHarness::new();
        let ticket = sample_ticket(3);
        let id = ticket.id;
        h.store.insert_ticket(ticket);

        let res = h
            .router()
            .oneshot(staff_request(
                &h,
                "POST",
                &format!("/api/tickets/{id}/messages"),
                Some(serde_json::json!({"content": "Please restart the PLC"})),
            ))
            .await
            .unwrap();
        let json = body_json(res).await;
        assert_eq!(json["email_sent"], true);
        assert_eq!(json["message"]["sender_type"], "agent");
        assert_eq!(h.mailer.sent()[0].subject, "Re: [TKT-0003] Press line stopped");
    }

    #[tokio::test]
    async fn test_patch_resolves_and_unassigns() {
        let h = TestHarness::new();
        let mut ticket = sample_ticket(1);
        ticket.assigned_to = Some(Uuid::new_v4());
        let id = ticket.id;
        h.store.insert_ticket(ticket);

        let res = h
            .router()
            .oneshot(staff_request(
                &h,
                "PATCH",
                &format!("/api/tickets/{id}"),
                Some(serde_json::json!({"status": "resolved", "assigned_to": null})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["resolution_email_sent"], true);

        let stored = h.store.get_ticket(id).await.unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Resolved);
        assert!(stored.resolved_at.is_some());
        assert_eq!(stored.assigned_to, None);
    }

    #[tokio::test]
    async fn test_patch_without_assignee_keeps_it() {
        let h = TestHarness::new();
        let agent = Uuid::new_v4();
        let mut ticket = sample_ticket(1);
        ticket.assigned_to = Some(agent);
        let id = ticket.id;
        h.store.insert_ticket(ticket);

        h.router()
            .oneshot(staff_request(
                &h,
                "PATCH",
                &format!("/api/tickets/{id}"),
                Some(serde_json::json!({"priority": "urgent"})),
            ))
            .await
            .unwrap();

        let stored = h.store.get_ticket(id).await.unwrap().unwrap();
        assert_eq!(stored.priority, TicketPriority::Urgent);
        assert_eq!(stored.assigned_to, Some(agent));
    }

    #[tokio::test]
    async fn test_patch_invalid_priority_is_400() {
        let h = TestHarness::new();
        let ticket = sample_ticket(1);
        let id = ticket.id;
        h.store.insert_ticket(ticket);

        let res = h
            .router()
            .oneshot(staff_request(
                &h,
                "PATCH",
                &format!("/api/tickets/{id}"),
                Some(serde_json::json!({"priority": "critical"})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
