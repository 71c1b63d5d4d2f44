//! Inbound email pipeline
//!
//! Resend delivers received mail as a signed webhook. The payload is verified
//! ([`signature`]), parsed into a [`ReceivedEmail`], reduced to a message body
//! ([`body`]) and then either threaded onto an existing ticket or turned into
//! a new one ([`ingest`]).

pub mod address;
pub mod body;
pub mod ingest;
pub mod signature;
pub mod subject;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

pub use ingest::ingest;
pub use signature::{SignatureHeaders, WebhookVerifier};

/// Only event type that creates tickets or messages
pub const EMAIL_RECEIVED: &str = "email.received";

/// Webhook envelope: `{ "type": "...", "data": { ... } }`
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `data` of an `email.received` event
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedEmail {
    /// Provider message id, used as the idempotency key
    #[serde(default)]
    pub email_id: Option<String>,
    pub from: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
}

impl ReceivedEmail {
    /// Subject with surrounding whitespace removed, or a placeholder
    pub fn subject_or_default(&self) -> String {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("(no subject)")
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundAttachment {
    #[serde(default)]
    pub filename: Option<String>,
    /// Base64 content
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl InboundAttachment {
    /// Decoded bytes; line breaks inside the base64 are tolerated.
    pub fn decode(&self) -> Option<Vec<u8>> {
        let content = self.content.as_deref()?;
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).ok()
    }
}

/// What the pipeline did with one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    TicketCreated {
        ticket_id: Uuid,
        ticket_number: i64,
        message_id: Uuid,
        email_sent: bool,
    },
    MessageAdded {
        ticket_id: Uuid,
        ticket_number: i64,
        message_id: Uuid,
        reopened: bool,
    },
    DuplicateSkipped,
}

impl IngestOutcome {
    pub fn action(&self) -> &'static str {
        match self {
            Self::TicketCreated { .. } => "ticket_created",
            Self::MessageAdded { .. } => "message_added",
            Self::DuplicateSkipped => "duplicate_skipped",
        }
    }
}

/// `to` arrives as either a string or a list of strings
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Nothing,
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Nothing => Vec::new(),
    })
}
