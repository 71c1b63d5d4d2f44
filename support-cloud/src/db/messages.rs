use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::support::{AttachmentRef, Message, NewMessage, SenderType};

use crate::store::BoxError;

const COLUMNS: &str = "id, ticket_id, content, sender_type, sender_id, sender_email, \
     sender_name, is_internal, attachments, created_at";

#[derive(sqlx::FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub content: String,
    pub sender_type: String,
    pub sender_id: Option<Uuid>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub is_internal: bool,
    pub attachments: Json<Vec<AttachmentRef>>,
    pub created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = BoxError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let sender_type = SenderType::from_db(&row.sender_type)
            .ok_or_else(|| format!("Unknown sender type: {}", row.sender_type))?;
        Ok(Message {
            id: row.id,
            ticket_id: row.ticket_id,
            content: row.content,
            sender_type,
            sender_id: row.sender_id,
            sender_email: row.sender_email,
            sender_name: row.sender_name,
            is_internal: row.is_internal,
            attachments: row.attachments.0,
            created_at: row.created_at,
        })
    }
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO messages (id, ticket_id, content, sender_type, sender_id, sender_email,
                               sender_name, is_internal, attachments, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {COLUMNS}"
    )
}

/// Insert inside the caller's transaction, next to the ticket write
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    message: &NewMessage,
    now: i64,
) -> Result<Message, BoxError> {
    let row: MessageRow = sqlx::query_as(&insert_sql())
        .bind(Uuid::new_v4())
        .bind(message.ticket_id)
        .bind(&message.content)
        .bind(message.sender_type.as_db())
        .bind(message.sender_id)
        .bind(&message.sender_email)
        .bind(&message.sender_name)
        .bind(message.is_internal)
        .bind(Json(&message.attachments))
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
    row.try_into()
}

/// Thread in chronological order, internal notes included
pub async fn list_for_ticket(pool: &PgPool, ticket_id: Uuid) -> Result<Vec<Message>, BoxError> {
    let rows: Vec<MessageRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM messages WHERE ticket_id = $1 ORDER BY created_at, id"
    ))
    .bind(ticket_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Message::try_from).collect()
}
