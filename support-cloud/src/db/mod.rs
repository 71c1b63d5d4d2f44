//! Database access layer
//!
//! Free functions per table, wrapped by [`PgStore`] to implement
//! [`SupportStore`].

pub mod companies;
pub mod inbound;
pub mod messages;
pub mod sla;
pub mod staff;
pub mod tickets;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use shared::support::{
    AttachmentRef, Company, Message, NewMessage, NewTicket, SlaTarget, Ticket,
};
use shared::util::now_millis;

use crate::store::{
    BoxError, SupportStore, TicketChange, TicketFilter, TicketPage, TicketUpdate,
};
use staff::StaffProfile;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupportStore for PgStore {
    async fn find_company_by_domain(&self, domain: &str) -> Result<Option<Company>, BoxError> {
        Ok(companies::find_by_domain(&self.pool, domain).await?)
    }

    async fn create_company(&self, name: &str, domain: &str) -> Result<Company, BoxError> {
        Ok(companies::upsert(&self.pool, name, domain, now_millis()).await?)
    }

    async fn get_company(&self, id: Uuid) -> Result<Option<Company>, BoxError> {
        Ok(companies::find_by_id(&self.pool, id).await?)
    }

    async fn list_companies(&self) -> Result<Vec<Company>, BoxError> {
        Ok(companies::list(&self.pool).await?)
    }

    async fn open_ticket(
        &self,
        ticket: &NewTicket,
        content: &str,
        attachments: &[AttachmentRef],
    ) -> Result<(Ticket, Message), BoxError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;
        let created = tickets::insert(&mut tx, ticket, now).await?;
        let mut first = NewMessage::from_customer(
            created.id,
            content,
            &created.email,
            created.name.as_deref(),
        );
        first.attachments = attachments.to_vec();
        let message = messages::insert(&mut tx, &first, now).await?;
        tx.commit().await?;
        Ok((created, message))
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, BoxError> {
        tickets::find_by_id(&self.pool, id).await
    }

    async fn find_ticket_by_number(&self, number: i64) -> Result<Option<Ticket>, BoxError> {
        tickets::find_by_number(&self.pool, number).await
    }

    async fn find_recent_email_ticket(
        &self,
        email: &str,
        subject: &str,
        since: i64,
    ) -> Result<Option<Ticket>, BoxError> {
        tickets::find_recent_from_email(&self.pool, email, subject, since).await
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> Result<TicketPage, BoxError> {
        tickets::list(&self.pool, filter).await
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        update: &TicketUpdate,
        now: i64,
    ) -> Result<Option<TicketChange>, BoxError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut ticket) = tickets::find_for_update(&mut tx, id).await? else {
            return Ok(None);
        };
        let previous_status = ticket.status;
        update.apply(&mut ticket, now);
        tickets::update(&mut tx, &ticket).await?;
        tx.commit().await?;
        Ok(Some(TicketChange {
            previous_status,
            ticket,
        }))
    }

    async fn tickets_created_between(
        &self,
        from: i64,
        to: i64,
        company_id: Option<Uuid>,
    ) -> Result<Vec<Ticket>, BoxError> {
        tickets::created_between(&self.pool, from, to, company_id).await
    }

    async fn add_customer_reply(
        &self,
        message: &NewMessage,
        now: i64,
    ) -> Result<Option<(Message, bool)>, BoxError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut ticket) = tickets::find_for_update(&mut tx, message.ticket_id).await? else {
            return Ok(None);
        };
        let stored = messages::insert(&mut tx, message, now).await?;
        let reopened = ticket.reopen_on_customer_reply(now);
        ticket.updated_at = now;
        tickets::update(&mut tx, &ticket).await?;
        tx.commit().await?;
        Ok(Some((stored, reopened)))
    }

    async fn add_agent_message(
        &self,
        message: &NewMessage,
        now: i64,
    ) -> Result<Option<(Message, Ticket)>, BoxError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut ticket) = tickets::find_for_update(&mut tx, message.ticket_id).await? else {
            return Ok(None);
        };
        let stored = messages::insert(&mut tx, message, now).await?;
        ticket.record_agent_message(message.is_internal, now);
        tickets::update(&mut tx, &ticket).await?;
        tx.commit().await?;
        Ok(Some((stored, ticket)))
    }

    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<Message>, BoxError> {
        messages::list_for_ticket(&self.pool, ticket_id).await
    }

    async fn list_sla_targets(&self) -> Result<Vec<SlaTarget>, BoxError> {
        sla::list(&self.pool).await
    }

    async fn upsert_sla_targets(&self, targets: &[SlaTarget]) -> Result<(), BoxError> {
        sla::upsert_all(&self.pool, targets, now_millis()).await
    }

    async fn find_staff_by_email(&self, email: &str) -> Result<Option<StaffProfile>, BoxError> {
        Ok(staff::find_by_email(&self.pool, email).await?)
    }

    async fn claim_inbound_email(&self, email_id: &str, now: i64) -> Result<bool, BoxError> {
        Ok(inbound::claim(&self.pool, email_id, now).await?)
    }

    async fn release_inbound_email(&self, email_id: &str) -> Result<(), BoxError> {
        Ok(inbound::release(&self.pool, email_id).await?)
    }
}
