//! Decide what an inbound email becomes
//!
//! A subject carrying `[TKT-n]` is a reply and is threaded onto ticket `n`;
//! anything else opens a new email-sourced ticket.

use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::support::{
    AttachmentRef, NewMessage, NewTicket, TicketPriority, TicketSource, format_ticket_id,
};
use shared::util::now_millis;

use super::address::{Sender, parse_sender};
use super::body::{ExtractedBody, extract_body};
use super::subject::extract_ticket_number;
use super::{IngestOutcome, ReceivedEmail};
use crate::error::ServiceResult;
use crate::services::{attachments, companies, tickets};
use crate::state::AppState;

/// Same sender + subject within this window is treated as a redelivery
pub const DUPLICATE_WINDOW_MILLIS: i64 = 5 * 60 * 1000;

const DEFAULT_PRODUCT: &str = "general";
const DEFAULT_ISSUE_TYPE: &str = "other";

/// Process one `email.received` payload.
///
/// The provider email id is claimed first so redeliveries are skipped. If
/// processing then fails on our side the claim is released, letting the
/// provider's retry go through. Every write after the claim is a single
/// transaction, so a released claim never leaves a half-written reply behind.
pub async fn ingest(state: &AppState, email: ReceivedEmail) -> ServiceResult<IngestOutcome> {
    let now = now_millis();

    let claimed = match email.email_id.as_deref().filter(|id| !id.is_empty()) {
        Some(email_id) => {
            if !state.store.claim_inbound_email(email_id, now).await? {
                tracing::info!(email_id, "Inbound email already processed, skipping");
                return Ok(IngestOutcome::DuplicateSkipped);
            }
            Some(email_id.to_string())
        }
        None => None,
    };

    let result = process(state, &email, now).await;

    if let (Err(err), Some(email_id)) = (&result, &claimed)
        && err.is_server_error()
        && let Err(release_err) = state.store.release_inbound_email(email_id).await
    {
        tracing::error!(email_id = %email_id, error = %release_err, "Failed to release inbound email claim");
    }

    result
}

async fn process(
    state: &AppState,
    email: &ReceivedEmail,
    now: i64,
) -> ServiceResult<IngestOutcome> {
    let sender = parse_sender(&email.from);
    if sender.email.is_empty() {
        return Err(
            AppError::with_message(ErrorCode::WebhookPayloadInvalid, "Missing sender address")
                .into(),
        );
    }

    let subject = email.subject_or_default();
    let body = extract_body(email);
    tracing::debug!(rule = body.rule, "Inbound body extracted");

    match extract_ticket_number(&subject) {
        Some(number) => add_reply(state, email, &sender, number, body, now).await,
        None => open_ticket(state, email, sender, subject, body, now).await,
    }
}

async fn add_reply(
    state: &AppState,
    email: &ReceivedEmail,
    sender: &Sender,
    ticket_number: i64,
    body: ExtractedBody,
    now: i64,
) -> ServiceResult<IngestOutcome> {
    let not_found = || {
        AppError::with_message(
            ErrorCode::TicketNotFound,
            format!("Ticket {} not found", format_ticket_id(ticket_number)),
        )
    };
    let ticket = state
        .store
        .find_ticket_by_number(ticket_number)
        .await?
        .ok_or_else(not_found)?;

    // CC'd colleagues reply too; keep their message but note it
    if !ticket.email.eq_ignore_ascii_case(&sender.email) {
        tracing::warn!(
            ticket_number,
            requester = %ticket.email,
            sender = %sender.email,
            "Reply sender does not match ticket requester"
        );
    }

    let stored = upload_attachments(state, email, body.consumed_attachment, Some(ticket.id)).await;
    let mut new_message = NewMessage::from_customer(
        ticket.id,
        body.text,
        &sender.email,
        sender.name.as_deref(),
    );
    new_message.attachments = stored;
    let (message, reopened) = state
        .store
        .add_customer_reply(&new_message, now)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(ticket_number, reopened, "Customer reply added from email");

    Ok(IngestOutcome::MessageAdded {
        ticket_id: ticket.id,
        ticket_number,
        message_id: message.id,
        reopened,
    })
}

async fn open_ticket(
    state: &AppState,
    email: &ReceivedEmail,
    sender: Sender,
    subject: String,
    body: ExtractedBody,
    now: i64,
) -> ServiceResult<IngestOutcome> {
    if let Some(existing) = state
        .store
        .find_recent_email_ticket(&sender.email, &subject, now - DUPLICATE_WINDOW_MILLIS)
        .await?
    {
        tracing::info!(
            ticket_number = existing.ticket_number,
            sender = %sender.email,
            "Duplicate inbound email within window, skipping"
        );
        return Ok(IngestOutcome::DuplicateSkipped);
    }

    let company_id =
        companies::resolve_for_email(state.store.as_ref(), &sender.email, None).await?;
    let stored = upload_attachments(state, email, body.consumed_attachment, None).await;

    let new_ticket = NewTicket {
        email: sender.email,
        name: sender.name,
        phone: None,
        company_id,
        subject,
        product: DEFAULT_PRODUCT.to_string(),
        issue_type: DEFAULT_ISSUE_TYPE.to_string(),
        priority: TicketPriority::Normal,
        source: TicketSource::Email,
    };
    let (ticket, message) = state
        .store
        .open_ticket(&new_ticket, &body.text, &stored)
        .await?;

    tracing::info!(ticket_number = ticket.ticket_number, "Ticket created from email");

    let email_sent = tickets::confirm_new_ticket(state, &ticket, &message.content).await;

    Ok(IngestOutcome::TicketCreated {
        ticket_id: ticket.id,
        ticket_number: ticket.ticket_number,
        message_id: message.id,
        email_sent,
    })
}

/// Best-effort upload of the real attachments (not the one used as body).
/// Failures are logged and the file is left out.
async fn upload_attachments(
    state: &AppState,
    email: &ReceivedEmail,
    skip: Option<usize>,
    ticket_id: Option<Uuid>,
) -> Vec<AttachmentRef> {
    let mut stored = Vec::new();
    for (index, attachment) in email.attachments.iter().enumerate() {
        if Some(index) == skip {
            continue;
        }
        let filename = attachment.filename.as_deref().unwrap_or("attachment");
        let Some(data) = attachment.decode() else {
            tracing::warn!(filename, "Inbound attachment is not valid base64, skipping");
            continue;
        };
        match attachments::store_attachment(
            state.attachments.as_ref(),
            ticket_id,
            filename,
            attachment.content_type.as_deref(),
            data,
        )
        .await
        {
            Ok(attachment_ref) => stored.push(attachment_ref),
            Err(e) => {
                tracing::warn!(filename, error = %e, "Inbound attachment dropped");
            }
        }
    }
    stored
}
