//! In-memory fakes for handler and service tests

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use shared::support::{
    AttachmentRef, Company, Message, NewMessage, NewTicket, SlaTarget, Ticket, TicketPriority,
    TicketSource, TicketStatus, default_sla_targets,
};
use shared::util::now_millis;

use crate::auth::{RateLimiter, StaffIdentity};
use crate::db::staff::StaffProfile;
use crate::email::{MailError, Mailer, OutboundEmail};
use crate::inbound::WebhookVerifier;
use crate::state::AppState;
use crate::storage::{AttachmentStore, StorageError};
use crate::store::{
    BoxError, SupportStore, TicketChange, TicketFilter, TicketPage, TicketUpdate,
};

pub const JWT_SECRET: &str = "test-jwt-secret";

pub fn sample_ticket(ticket_number: i64) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        ticket_number,
        email: "jane@acme.com".into(),
        name: Some("Jane Doe".into()),
        phone: None,
        company_id: None,
        subject: "Press line stopped".into(),
        product: "mes".into(),
        issue_type: "outage".into(),
        status: TicketStatus::Open,
        priority: TicketPriority::Normal,
        source: TicketSource::Web,
        assigned_to: None,
        created_at: 0,
        updated_at: 0,
        first_response_at: None,
        resolved_at: None,
        closed_at: None,
    }
}

pub fn staff() -> StaffIdentity {
    StaffIdentity {
        staff_id: Uuid::from_u128(7),
        email: "sam@example.com".into(),
        name: "Sam Support".into(),
    }
}

// ── Store ──

struct Inner {
    companies: Vec<Company>,
    tickets: Vec<Ticket>,
    messages: Vec<Message>,
    sla: Vec<SlaTarget>,
    staff: Vec<StaffProfile>,
    claims: HashSet<String>,
    next_number: i64,
    fail_writes: bool,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                companies: Vec::new(),
                tickets: Vec::new(),
                messages: Vec::new(),
                sla: default_sla_targets(),
                staff: Vec::new(),
                claims: HashSet::new(),
                next_number: 1,
                fail_writes: false,
            }),
        }
    }
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn writable(&self) -> Result<MutexGuard<'_, Inner>, BoxError> {
        let inner = self.lock();
        if inner.fail_writes {
            return Err("simulated database outage".into());
        }
        Ok(inner)
    }

    /// Make ticket, message and company writes fail
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn ticket_count(&self) -> usize {
        self.lock().tickets.len()
    }

    pub fn is_claimed(&self, email_id: &str) -> bool {
        self.lock().claims.contains(email_id)
    }

    /// Edit a stored ticket directly (e.g. to age it)
    pub fn with_ticket(&self, id: Uuid, edit: impl FnOnce(&mut Ticket)) {
        let mut inner = self.lock();
        if let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == id) {
            edit(ticket);
        }
    }

    pub fn insert_ticket(&self, ticket: Ticket) {
        let mut inner = self.lock();
        inner.next_number = inner.next_number.max(ticket.ticket_number + 1);
        inner.tickets.push(ticket);
    }

    pub fn add_staff(&self, email: &str, name: &str, password: &str, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().staff.push(StaffProfile {
            id,
            email: email.to_string(),
            name: name.to_string(),
            role: "agent".to_string(),
            hashed_password: crate::util::hash_password(password).unwrap(),
            is_active,
        });
        id
    }
}

fn matches(ticket: &Ticket, filter: &TicketFilter) -> bool {
    if filter.status.is_some_and(|s| s != ticket.status)
        || filter.priority.is_some_and(|p| p != ticket.priority)
        || filter.product.as_ref().is_some_and(|p| *p != ticket.product)
        || filter.issue_type.as_ref().is_some_and(|i| *i != ticket.issue_type)
        || filter.company_id.is_some_and(|c| Some(c) != ticket.company_id)
        || filter.assigned_to.is_some_and(|a| Some(a) != ticket.assigned_to)
    {
        return false;
    }
    match &filter.search {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            ticket.subject.to_lowercase().contains(&term)
                || ticket.email.to_lowercase().contains(&term)
                || ticket
                    .name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&term))
                || filter.ticket_number == Some(ticket.ticket_number)
        }
    }
}

fn stored_message(message: &NewMessage, now: i64) -> Message {
    Message {
        id: Uuid::new_v4(),
        ticket_id: message.ticket_id,
        content: message.content.clone(),
        sender_type: message.sender_type,
        sender_id: message.sender_id,
        sender_email: message.sender_email.clone(),
        sender_name: message.sender_name.clone(),
        is_internal: message.is_internal,
        attachments: message.attachments.clone(),
        created_at: now,
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn find_company_by_domain(&self, domain: &str) -> Result<Option<Company>, BoxError> {
        Ok(self.lock().companies.iter().find(|c| c.domain == domain).cloned())
    }

    async fn create_company(&self, name: &str, domain: &str) -> Result<Company, BoxError> {
        let mut inner = self.writable()?;
        if let Some(existing) = inner.companies.iter().find(|c| c.domain == domain) {
            return Ok(existing.clone());
        }
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.to_string(),
            created_at: now_millis(),
        };
        inner.companies.push(company.clone());
        Ok(company)
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, BoxError> {
        Ok(self.lock().companies.iter().find(|c| c.id == id).cloned())
    }

    async fn list_companies(&self) -> Result<Vec<Company>, BoxError> {
        let mut companies = self.lock().companies.clone();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn open_ticket(
        &self,
        ticket: &NewTicket,
        content: &str,
        attachments: &[AttachmentRef],
    ) -> Result<(Ticket, Message), BoxError> {
        let mut inner = self.writable()?;
        let now = now_millis();
        let number = inner.next_number;
        inner.next_number += 1;

        let created = Ticket {
            id: Uuid::new_v4(),
            ticket_number: number,
            email: ticket.email.clone(),
            name: ticket.name.clone(),
            phone: ticket.phone.clone(),
            company_id: ticket.company_id,
            subject: ticket.subject.clone(),
            product: ticket.product.clone(),
            issue_type: ticket.issue_type.clone(),
            status: TicketStatus::Open,
            priority: ticket.priority,
            source: ticket.source,
            assigned_to: None,
            created_at: now,
            updated_at: now,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
        };
        let message = Message {
            id: Uuid::new_v4(),
            ticket_id: created.id,
            content: content.to_string(),
            sender_type: shared::support::SenderType::Customer,
            sender_id: None,
            sender_email: Some(created.email.clone()),
            sender_name: created.name.clone(),
            is_internal: false,
            attachments: attachments.to_vec(),
            created_at: now,
        };
        inner.tickets.push(created.clone());
        inner.messages.push(message.clone());
        Ok((created, message))
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, BoxError> {
        Ok(self.lock().tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_ticket_by_number(&self, number: i64) -> Result<Option<Ticket>, BoxError> {
        Ok(self
            .lock()
            .tickets
            .iter()
            .find(|t| t.ticket_number == number)
            .cloned())
    }

    async fn find_recent_email_ticket(
        &self,
        email: &str,
        subject: &str,
        since: i64,
    ) -> Result<Option<Ticket>, BoxError> {
        Ok(self
            .lock()
            .tickets
            .iter()
            .filter(|t| {
                t.email == email
                    && t.subject == subject
                    && t.source == TicketSource::Email
                    && t.created_at >= since
            })
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<TicketPage, BoxError> {
        let mut found: Vec<Ticket> = self
            .lock()
            .tickets
            .iter()
            .filter(|t| matches(t, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.ticket_number.cmp(&a.ticket_number))
        });
        let total = found.len() as i64;
        let tickets = found
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok(TicketPage { tickets, total })
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        update: &TicketUpdate,
        now: i64,
    ) -> Result<Option<TicketChange>, BoxError> {
        let mut inner = self.writable()?;
        let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        let previous_status = ticket.status;
        update.apply(ticket, now);
        Ok(Some(TicketChange {
            previous_status,
            ticket: ticket.clone(),
        }))
    }

    async fn tickets_created_between(
        &self,
        from: i64,
        to: i64,
        company_id: Option<Uuid>,
    ) -> Result<Vec<Ticket>, BoxError> {
        let mut found: Vec<Ticket> = self
            .lock()
            .tickets
            .iter()
            .filter(|t| t.created_at >= from && t.created_at < to)
            .filter(|t| company_id.is_none() || t.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn add_customer_reply(
        &self,
        message: &NewMessage,
        now: i64,
    ) -> Result<Option<(Message, bool)>, BoxError> {
        let mut inner = self.writable()?;
        let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == message.ticket_id) else {
            return Ok(None);
        };
        let reopened = ticket.reopen_on_customer_reply(now);
        ticket.updated_at = now;
        let stored = stored_message(message, now);
        inner.messages.push(stored.clone());
        Ok(Some((stored, reopened)))
    }

    async fn add_agent_message(
        &self,
        message: &NewMessage,
        now: i64,
    ) -> Result<Option<(Message, Ticket)>, BoxError> {
        let mut inner = self.writable()?;
        let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == message.ticket_id) else {
            return Ok(None);
        };
        ticket.record_agent_message(message.is_internal, now);
        let ticket = ticket.clone();
        let stored = stored_message(message, now);
        inner.messages.push(stored.clone());
        Ok(Some((stored, ticket)))
    }

    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<Message>, BoxError> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn list_sla_targets(&self) -> Result<Vec<SlaTarget>, BoxError> {
        let mut targets = self.lock().sla.clone();
        targets.sort_by_key(|t| std::cmp::Reverse(t.priority as u8));
        Ok(targets)
    }

    async fn upsert_sla_targets(&self, targets: &[SlaTarget]) -> Result<(), BoxError> {
        let mut inner = self.lock();
        for target in targets {
            inner.sla.retain(|t| t.priority != target.priority);
            inner.sla.push(*target);
        }
        Ok(())
    }

    async fn find_staff_by_email(&self, email: &str) -> Result<Option<StaffProfile>, BoxError> {
        Ok(self.lock().staff.iter().find(|s| s.email == email).cloned())
    }

    async fn claim_inbound_email(&self, email_id: &str, _now: i64) -> Result<bool, BoxError> {
        Ok(self.lock().claims.insert(email_id.to_string()))
    }

    async fn release_inbound_email(&self, email_id: &str) -> Result<(), BoxError> {
        self.lock().claims.remove(email_id);
        Ok(())
    }
}

// ── Mailer ──

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: Mutex<bool>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if *self.failing.lock().unwrap() {
            return Err(MailError::Rejected {
                status: 503,
                body: "provider unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ── Attachments ──

#[derive(Default)]
pub struct MemoryAttachmentStore {
    objects: Mutex<Vec<(String, usize)>>,
}

impl MemoryAttachmentStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|(k, _)| k != key);
        objects.push((key.to_string(), data.len()));
        Ok(format!("https://files.test/{key}"))
    }
}

// ── Harness ──

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub attachments: Arc<MemoryAttachmentStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_verifier(WebhookVerifier::new(None))
    }

    pub fn with_verifier(webhook_verifier: WebhookVerifier) -> Self {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let attachments = Arc::new(MemoryAttachmentStore::default());
        let state = AppState {
            store: store.clone(),
            mailer: mailer.clone(),
            attachments: attachments.clone(),
            webhook_verifier,
            jwt_secret: JWT_SECRET.to_string(),
            notify_email: None,
            rate_limiter: RateLimiter::new(),
        };
        Self {
            state,
            store,
            mailer,
            attachments,
        }
    }

    /// Router with state, as served by `main`
    pub fn router(&self) -> axum::Router {
        crate::api::create_router(self.state.clone())
    }

    /// `Authorization` header value for the default staff member
    pub fn bearer(&self) -> String {
        let identity = staff();
        let token = crate::auth::staff_auth::create_token(
            identity.staff_id,
            &identity.email,
            &identity.name,
            JWT_SECRET,
        )
        .unwrap();
        format!("Bearer {token}")
    }
}

/// Collect a response body as JSON
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
