//! Resend inbound webhook
//!
//! POST /api/webhooks/resend: raw body is required for svix signature verification

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use shared::support::format_ticket_id;

use crate::api::ApiResult;
use crate::inbound::{
    self, EMAIL_RECEIVED, IngestOutcome, ReceivedEmail, SignatureHeaders, WebhookEvent,
};
use crate::state::AppState;

const ENDPOINT: &str = "/api/webhooks/resend";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_number: Option<i64>,
    /// Display reference, e.g. `TKT-0042`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reopened: Option<bool>,
}

impl WebhookResponse {
    fn bare(action: &'static str) -> Self {
        Self {
            success: true,
            action,
            id: None,
            ticket_number: None,
            ticket_id: None,
            message_id: None,
            email_sent: None,
            reopened: None,
        }
    }
}

impl From<IngestOutcome> for WebhookResponse {
    fn from(outcome: IngestOutcome) -> Self {
        let mut response = Self::bare(outcome.action());
        match outcome {
            IngestOutcome::TicketCreated {
                ticket_id,
                ticket_number,
                message_id,
                email_sent,
            } => {
                response.id = Some(ticket_id);
                response.ticket_number = Some(ticket_number);
                response.ticket_id = Some(format_ticket_id(ticket_number));
                response.message_id = Some(message_id);
                response.email_sent = Some(email_sent);
            }
            IngestOutcome::MessageAdded {
                ticket_id,
                ticket_number,
                message_id,
                reopened,
            } => {
                response.id = Some(ticket_id);
                response.ticket_number = Some(ticket_number);
                response.ticket_id = Some(format_ticket_id(ticket_number));
                response.message_id = Some(message_id);
                response.reopened = Some(reopened);
            }
            IngestOutcome::DuplicateSkipped => {}
        }
        response
    }
}

/// Handle an inbound email event
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookResponse> {
    if let Err(e) = state
        .webhook_verifier
        .verify(SignatureHeaders::from_map(&headers), &body)
    {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        return Err(AppError::new(ErrorCode::WebhookSignatureInvalid));
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(%e, "Failed to parse webhook JSON");
        AppError::with_message(ErrorCode::WebhookPayloadInvalid, e.to_string())
    })?;

    if event.event_type != EMAIL_RECEIVED {
        tracing::debug!(event_type = %event.event_type, "Ignoring webhook event");
        return Ok(Json(WebhookResponse::bare("ignored")));
    }

    let email: ReceivedEmail = serde_json::from_value(event.data).map_err(|e| {
        tracing::warn!(%e, "Malformed email.received payload");
        AppError::with_message(ErrorCode::WebhookPayloadInvalid, e.to_string())
    })?;

    tracing::info!(
        email_id = ?email.email_id,
        from = %email.from,
        attachments = email.attachments.len(),
        "Received inbound email"
    );

    let outcome = inbound::ingest(&state, email).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/webhooks/resend
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "endpoint": ENDPOINT,
    }))
}
