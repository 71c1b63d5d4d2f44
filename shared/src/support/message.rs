//! Ticket message model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Agent,
    System,
}

impl SenderType {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "agent" => Some(Self::Agent),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Agent => "agent",
            Self::System => "system",
        }
    }
}

/// Stored file attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub url: String,
}

/// Message on a ticket thread
///
/// Internal notes (`is_internal`) are visible to staff only and are never
/// mailed to the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub content: String,
    pub sender_type: SenderType,
    pub sender_id: Option<Uuid>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub is_internal: bool,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    pub created_at: i64,
}

/// Fields required to append a message
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub ticket_id: Uuid,
    pub content: String,
    pub sender_type: SenderType,
    pub sender_id: Option<Uuid>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub is_internal: bool,
    pub attachments: Vec<AttachmentRef>,
}

impl NewMessage {
    /// Customer-authored, customer-visible message
    pub fn from_customer(
        ticket_id: Uuid,
        content: impl Into<String>,
        email: &str,
        name: Option<&str>,
    ) -> Self {
        Self {
            ticket_id,
            content: content.into(),
            sender_type: SenderType::Customer,
            sender_id: None,
            sender_email: Some(email.to_string()),
            sender_name: name.map(str::to_string),
            is_internal: false,
            attachments: Vec::new(),
        }
    }
}
