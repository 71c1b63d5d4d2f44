//! Ticket workflows behind the REST handlers

use serde::Serialize;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::support::{
    AttachmentRef, Company, Message, NewMessage, NewTicket, SenderType, Ticket, TicketPriority,
    TicketSource, TicketStatus,
};
use shared::util::now_millis;

use crate::auth::StaffIdentity;
use crate::email::{self, templates};
use crate::error::ServiceResult;
use crate::services::companies;
use crate::state::AppState;
use crate::store::TicketChange;
pub use crate::store::TicketUpdate;

/// Validated web form submission
#[derive(Debug, Clone)]
pub struct TicketSubmission {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: String,
    pub message: String,
    pub product: String,
    pub issue_type: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub ticket: Ticket,
    pub message: Message,
    pub email_sent: bool,
}

/// Create a ticket from the public form and confirm it to the requester.
///
/// A failed confirmation is logged and reported as `email_sent = false`; the
/// ticket stays created.
pub async fn submit_web_ticket(
    state: &AppState,
    submission: TicketSubmission,
) -> ServiceResult<CreatedTicket> {
    let email = submission.email.trim().to_lowercase();
    let company_id = companies::resolve_for_email(
        state.store.as_ref(),
        &email,
        submission.company.as_deref(),
    )
    .await?;

    let new_ticket = NewTicket {
        email,
        name: submission.name,
        phone: submission.phone,
        company_id,
        subject: submission.subject,
        product: submission.product,
        issue_type: submission.issue_type,
        priority: submission.priority,
        source: TicketSource::Web,
    };
    let (ticket, message) = state
        .store
        .open_ticket(&new_ticket, &submission.message, &[])
        .await?;

    tracing::info!(
        ticket_number = ticket.ticket_number,
        company_id = ?ticket.company_id,
        "Ticket created from web form"
    );

    let email_sent = confirm_new_ticket(state, &ticket, &message.content).await;

    Ok(CreatedTicket {
        ticket,
        message,
        email_sent,
    })
}

/// Confirmation to the requester plus the optional staff notification
pub async fn confirm_new_ticket(state: &AppState, ticket: &Ticket, first_message: &str) -> bool {
    let sent = email::send_logged(
        state.mailer.as_ref(),
        &templates::ticket_confirmation(ticket, first_message),
    )
    .await;

    if let Some(notify) = &state.notify_email {
        email::send_logged(
            state.mailer.as_ref(),
            &templates::staff_notification(ticket, notify, first_message),
        )
        .await;
    }
    sent
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub display_id: String,
    pub messages: Vec<Message>,
    pub company: Option<Company>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::new(ErrorCode::TicketNotFound).with_detail("id", id.to_string())
}

pub async fn load_ticket(state: &AppState, id: Uuid) -> ServiceResult<Ticket> {
    Ok(state.store.get_ticket(id).await?.ok_or_else(|| not_found(id))?)
}

pub async fn ticket_detail(state: &AppState, id: Uuid) -> ServiceResult<TicketDetail> {
    let ticket = load_ticket(state, id).await?;
    let messages = state.store.list_messages(id).await?;
    let company = match ticket.company_id {
        Some(company_id) => state.store.get_company(company_id).await?,
        None => None,
    };
    Ok(TicketDetail {
        display_id: ticket.display_id(),
        ticket,
        messages,
        company,
    })
}

#[derive(Debug, Clone)]
pub struct UpdatedTicket {
    pub ticket: Ticket,
    /// Set when the update resolved the ticket
    pub resolution_email_sent: Option<bool>,
}

pub async fn update_ticket(
    state: &AppState,
    id: Uuid,
    mut update: TicketUpdate,
) -> ServiceResult<UpdatedTicket> {
    update.product = update
        .product
        .map(|p| non_blank(p, "product"))
        .transpose()?;
    update.issue_type = update
        .issue_type
        .map(|i| non_blank(i, "issue_type"))
        .transpose()?;

    let TicketChange {
        previous_status,
        ticket,
    } = state
        .store
        .update_ticket(id, &update, now_millis())
        .await?
        .ok_or_else(|| not_found(id))?;

    let resolved_now =
        ticket.status == TicketStatus::Resolved && previous_status != TicketStatus::Resolved;
    let resolution_email_sent = if resolved_now {
        Some(
            email::send_logged(state.mailer.as_ref(), &templates::ticket_resolved(&ticket)).await,
        )
    } else {
        None
    };

    if previous_status != ticket.status {
        tracing::info!(
            ticket_number = ticket.ticket_number,
            from = previous_status.as_db(),
            to = ticket.status.as_db(),
            "Ticket status changed"
        );
    }

    Ok(UpdatedTicket {
        ticket,
        resolution_email_sent,
    })
}

fn non_blank(value: String, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::missing_fields(&[field]));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct AgentReply {
    pub content: String,
    pub is_internal: bool,
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub message: Message,
    /// `None` for internal notes, which are never mailed
    pub email_sent: Option<bool>,
}

/// Append a staff message. Customer-visible replies are mailed and count as
/// the first response; internal notes stay on the thread only.
pub async fn add_agent_message(
    state: &AppState,
    ticket_id: Uuid,
    staff: &StaffIdentity,
    reply: AgentReply,
) -> ServiceResult<PostedMessage> {
    let content = reply.content.trim();
    if content.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyMessage).into());
    }

    let new_message = NewMessage {
        ticket_id,
        content: content.to_string(),
        sender_type: SenderType::Agent,
        sender_id: Some(staff.staff_id),
        sender_email: Some(staff.email.clone()),
        sender_name: Some(staff.name.clone()),
        is_internal: reply.is_internal,
        attachments: reply.attachments,
    };
    let (message, ticket) = state
        .store
        .add_agent_message(&new_message, now_millis())
        .await?
        .ok_or_else(|| not_found(ticket_id))?;

    let email_sent = if reply.is_internal {
        None
    } else {
        Some(
            email::send_logged(
                state.mailer.as_ref(),
                &templates::agent_reply(&ticket, &message.content, &staff.name),
            )
            .await,
        )
    };

    tracing::info!(
        ticket_number = ticket.ticket_number,
        internal = reply.is_internal,
        staff_id = %staff.staff_id,
        "Agent message added"
    );

    Ok(PostedMessage {
        message,
        email_sent,
    })
}
