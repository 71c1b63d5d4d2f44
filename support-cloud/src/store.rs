//! Persistence boundary
//!
//! Handlers and services talk to [`SupportStore`]; `db::PgStore` is the
//! Postgres implementation and `testing::MemoryStore` backs the handler tests.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use shared::support::{
    AttachmentRef, Company, Message, NewMessage, NewTicket, SlaTarget, Ticket, TicketPriority,
    TicketStatus,
};

use crate::db::staff::StaffProfile;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Ticket list filter; `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub product: Option<String>,
    pub issue_type: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    /// Case-insensitive substring of subject, email or name
    pub search: Option<String>,
    /// Exact ticket number, from a `TKT-n` search
    pub ticket_number: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: i64,
}

/// Staff edit; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    /// `Some(None)` unassigns
    pub assigned_to: Option<Option<Uuid>>,
    pub product: Option<String>,
    pub issue_type: Option<String>,
}

impl TicketUpdate {
    /// Apply to the current row. Stores call this on a locked read so
    /// concurrent writers never overwrite each other's fields.
    pub fn apply(&self, ticket: &mut Ticket, now: i64) {
        if let Some(product) = &self.product {
            ticket.product = product.clone();
        }
        if let Some(issue_type) = &self.issue_type {
            ticket.issue_type = issue_type.clone();
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(assigned_to) = self.assigned_to {
            ticket.assigned_to = assigned_to;
        }
        if let Some(status) = self.status {
            ticket.transition(status, now);
        }
        ticket.updated_at = now;
    }
}

/// Result of a ticket update
#[derive(Debug, Clone)]
pub struct TicketChange {
    /// Status of the row just before this update was applied
    pub previous_status: TicketStatus,
    pub ticket: Ticket,
}

#[async_trait]
pub trait SupportStore: Send + Sync {
    // ── Companies ──
    async fn find_company_by_domain(&self, domain: &str) -> Result<Option<Company>, BoxError>;
    /// Insert, or return the existing row for the same domain
    async fn create_company(&self, name: &str, domain: &str) -> Result<Company, BoxError>;
    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, BoxError>;
    async fn list_companies(&self) -> Result<Vec<Company>, BoxError>;

    // ── Tickets ──
    /// Insert a ticket together with its first customer message, atomically.
    async fn open_ticket(
        &self,
        ticket: &NewTicket,
        content: &str,
        attachments: &[AttachmentRef],
    ) -> Result<(Ticket, Message), BoxError>;
    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, BoxError>;
    async fn find_ticket_by_number(&self, number: i64) -> Result<Option<Ticket>, BoxError>;
    /// Email-sourced ticket with the same requester and subject created at or after `since`
    async fn find_recent_email_ticket(
        &self,
        email: &str,
        subject: &str,
        since: i64,
    ) -> Result<Option<Ticket>, BoxError>;
    async fn list_tickets(&self, filter: &TicketFilter) -> Result<TicketPage, BoxError>;
    /// Apply a staff edit atomically; `None` when the ticket does not exist.
    async fn update_ticket(
        &self,
        id: Uuid,
        update: &TicketUpdate,
        now: i64,
    ) -> Result<Option<TicketChange>, BoxError>;
    async fn tickets_created_between(
        &self,
        from: i64,
        to: i64,
        company_id: Option<Uuid>,
    ) -> Result<Vec<Ticket>, BoxError>;

    // ── Messages ──
    /// Append a customer message and reopen a finished ticket, in one
    /// transaction. Returns the message and whether the ticket reopened;
    /// `None` when the ticket does not exist.
    async fn add_customer_reply(
        &self,
        message: &NewMessage,
        now: i64,
    ) -> Result<Option<(Message, bool)>, BoxError>;
    /// Append a staff message and stamp the ticket, in one transaction.
    async fn add_agent_message(
        &self,
        message: &NewMessage,
        now: i64,
    ) -> Result<Option<(Message, Ticket)>, BoxError>;
    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<Message>, BoxError>;

    // ── SLA ──
    async fn list_sla_targets(&self) -> Result<Vec<SlaTarget>, BoxError>;
    async fn upsert_sla_targets(&self, targets: &[SlaTarget]) -> Result<(), BoxError>;

    // ── Staff ──
    async fn find_staff_by_email(&self, email: &str) -> Result<Option<StaffProfile>, BoxError>;

    // ── Inbound idempotency ──
    /// Record a provider email id; `false` when it was already recorded.
    async fn claim_inbound_email(&self, email_id: &str, now: i64) -> Result<bool, BoxError>;
    /// Forget a claim so a retried delivery is processed again
    async fn release_inbound_email(&self, email_id: &str) -> Result<(), BoxError>;
}
