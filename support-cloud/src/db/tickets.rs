use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::support::{NewTicket, Ticket, TicketPriority, TicketSource, TicketStatus};

use crate::store::{BoxError, TicketFilter, TicketPage};

const COLUMNS: &str = "id, ticket_number, email, name, phone, company_id, subject, product, \
     issue_type, status, priority, source, assigned_to, created_at, updated_at, \
     first_response_at, resolved_at, closed_at";

/// Shared by the list and count queries; binds $1..$8
const FILTER: &str = "($1::text IS NULL OR status = $1)
       AND ($2::text IS NULL OR priority = $2)
       AND ($3::text IS NULL OR product = $3)
       AND ($4::text IS NULL OR issue_type = $4)
       AND ($5::uuid IS NULL OR company_id = $5)
       AND ($6::uuid IS NULL OR assigned_to = $6)
       AND ($7::text IS NULL
            OR subject ILIKE $7 OR email ILIKE $7 OR name ILIKE $7
            OR ticket_number = $8)";

#[derive(sqlx::FromRow)]
pub struct TicketRow {
    pub id: Uuid,
    pub ticket_number: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<Uuid>,
    pub subject: String,
    pub product: String,
    pub issue_type: String,
    pub status: String,
    pub priority: String,
    pub source: String,
    pub assigned_to: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
    pub first_response_at: Option<i64>,
    pub resolved_at: Option<i64>,
    pub closed_at: Option<i64>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = BoxError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = TicketStatus::from_db(&row.status)
            .ok_or_else(|| format!("Unknown ticket status: {}", row.status))?;
        let priority = TicketPriority::from_db(&row.priority)
            .ok_or_else(|| format!("Unknown ticket priority: {}", row.priority))?;
        let source = TicketSource::from_db(&row.source)
            .ok_or_else(|| format!("Unknown ticket source: {}", row.source))?;
        Ok(Ticket {
            id: row.id,
            ticket_number: row.ticket_number,
            email: row.email,
            name: row.name,
            phone: row.phone,
            company_id: row.company_id,
            subject: row.subject,
            product: row.product,
            issue_type: row.issue_type,
            status,
            priority,
            source,
            assigned_to: row.assigned_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
            first_response_at: row.first_response_at,
            resolved_at: row.resolved_at,
            closed_at: row.closed_at,
        })
    }
}

fn into_tickets(rows: Vec<TicketRow>) -> Result<Vec<Ticket>, BoxError> {
    rows.into_iter().map(Ticket::try_from).collect()
}

/// Insert inside the caller's transaction; the sequence assigns `ticket_number`.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    ticket: &NewTicket,
    now: i64,
) -> Result<Ticket, BoxError> {
    let row: TicketRow = sqlx::query_as(&format!(
        "INSERT INTO tickets (id, email, name, phone, company_id, subject, product, issue_type,
                              status, priority, source, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&ticket.email)
    .bind(&ticket.name)
    .bind(&ticket.phone)
    .bind(ticket.company_id)
    .bind(&ticket.subject)
    .bind(&ticket.product)
    .bind(&ticket.issue_type)
    .bind(TicketStatus::Open.as_db())
    .bind(ticket.priority.as_db())
    .bind(ticket.source.as_db())
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    row.try_into()
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Ticket>, BoxError> {
    let row: Option<TicketRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM tickets WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(Ticket::try_from).transpose()
}

pub async fn find_by_number(pool: &PgPool, number: i64) -> Result<Option<Ticket>, BoxError> {
    let row: Option<TicketRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM tickets WHERE ticket_number = $1"))
            .bind(number)
            .fetch_optional(pool)
            .await?;
    row.map(Ticket::try_from).transpose()
}

pub async fn find_recent_from_email(
    pool: &PgPool,
    email: &str,
    subject: &str,
    since: i64,
) -> Result<Option<Ticket>, BoxError> {
    let row: Option<TicketRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tickets
         WHERE email = $1 AND subject = $2 AND source = 'email' AND created_at >= $3
         ORDER BY created_at DESC
         LIMIT 1"
    ))
    .bind(email)
    .bind(subject)
    .bind(since)
    .fetch_optional(pool)
    .await?;
    row.map(Ticket::try_from).transpose()
}

/// `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn list(pool: &PgPool, filter: &TicketFilter) -> Result<TicketPage, BoxError> {
    let search = filter.search.as_deref().map(like_pattern);

    let rows: Vec<TicketRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tickets
         WHERE {FILTER}
         ORDER BY created_at DESC, ticket_number DESC
         LIMIT $9 OFFSET $10"
    ))
    .bind(filter.status.map(|s| s.as_db()))
    .bind(filter.priority.map(|p| p.as_db()))
    .bind(filter.product.as_deref())
    .bind(filter.issue_type.as_deref())
    .bind(filter.company_id)
    .bind(filter.assigned_to)
    .bind(search.as_deref())
    .bind(filter.ticket_number)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tickets WHERE {FILTER}"))
        .bind(filter.status.map(|s| s.as_db()))
        .bind(filter.priority.map(|p| p.as_db()))
        .bind(filter.product.as_deref())
        .bind(filter.issue_type.as_deref())
        .bind(filter.company_id)
        .bind(filter.assigned_to)
        .bind(search.as_deref())
        .bind(filter.ticket_number)
        .fetch_one(pool)
        .await?;

    Ok(TicketPage {
        tickets: into_tickets(rows)?,
        total,
    })
}

/// Read and lock the row until the caller's transaction ends
pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Ticket>, BoxError> {
    let row: Option<TicketRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    row.map(Ticket::try_from).transpose()
}

/// Write back the mutable fields of a row locked with [`find_for_update`]
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    ticket: &Ticket,
) -> Result<(), BoxError> {
    sqlx::query(
        "UPDATE tickets
         SET status = $2, priority = $3, product = $4, issue_type = $5, assigned_to = $6,
             updated_at = $7, first_response_at = $8, resolved_at = $9, closed_at = $10
         WHERE id = $1",
    )
    .bind(ticket.id)
    .bind(ticket.status.as_db())
    .bind(ticket.priority.as_db())
    .bind(&ticket.product)
    .bind(&ticket.issue_type)
    .bind(ticket.assigned_to)
    .bind(ticket.updated_at)
    .bind(ticket.first_response_at)
    .bind(ticket.resolved_at)
    .bind(ticket.closed_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn created_between(
    pool: &PgPool,
    from: i64,
    to: i64,
    company_id: Option<Uuid>,
) -> Result<Vec<Ticket>, BoxError> {
    let rows: Vec<TicketRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM tickets
         WHERE created_at >= $1 AND created_at < $2
           AND ($3::uuid IS NULL OR company_id = $3)
         ORDER BY created_at"
    ))
    .bind(from)
    .bind(to)
    .bind(company_id)
    .fetch_all(pool)
    .await?;
    into_tickets(rows)
}
