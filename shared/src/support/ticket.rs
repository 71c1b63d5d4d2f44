//! Ticket model and its lifecycle enums

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of the human-readable ticket reference (`TKT-0042`)
pub const TICKET_PREFIX: &str = "TKT";

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    /// Waiting on the customer
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        Self::Open,
        Self::Pending,
        Self::InProgress,
        Self::Resolved,
        Self::Closed,
    ];

    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Resolved or closed; new customer correspondence reopens these.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

/// Ticket priority tier, also the key of the SLA table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [Self::Low, Self::Normal, Self::High, Self::Urgent];

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Channel a ticket was opened through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketSource {
    Web,
    Email,
}

impl TicketSource {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "web" => Some(Self::Web),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Email => "email",
        }
    }
}

/// Support ticket
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    /// Sequential number assigned by the database
    pub ticket_number: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<Uuid>,
    pub subject: String,
    pub product: String,
    pub issue_type: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub source: TicketSource,
    pub assigned_to: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
    pub first_response_at: Option<i64>,
    pub resolved_at: Option<i64>,
    pub closed_at: Option<i64>,
}

impl Ticket {
    /// Human-readable reference, e.g. `TKT-0007`
    pub fn display_id(&self) -> String {
        format_ticket_id(self.ticket_number)
    }

    /// Move to `status`, maintaining the lifecycle timestamps.
    ///
    /// Entering resolved/closed stamps `resolved_at`/`closed_at`; leaving the
    /// finished states for an active one clears both.
    pub fn transition(&mut self, status: TicketStatus, now: i64) {
        if self.status == status {
            return;
        }
        match status {
            TicketStatus::Resolved => {
                self.resolved_at = Some(now);
                self.closed_at = None;
            }
            TicketStatus::Closed => {
                if self.resolved_at.is_none() {
                    self.resolved_at = Some(now);
                }
                self.closed_at = Some(now);
            }
            TicketStatus::Open | TicketStatus::Pending | TicketStatus::InProgress => {
                self.resolved_at = None;
                self.closed_at = None;
            }
        }
        self.status = status;
        self.updated_at = now;
    }

    /// Reopen after new customer correspondence. Returns whether the status changed.
    pub fn reopen_on_customer_reply(&mut self, now: i64) -> bool {
        if self.status.is_finished() {
            self.transition(TicketStatus::Open, now);
            true
        } else {
            false
        }
    }

    /// Staff message on the thread. A customer-visible one stamps
    /// `first_response_at` the first time; internal notes only bump `updated_at`.
    pub fn record_agent_message(&mut self, is_internal: bool, now: i64) {
        if !is_internal && self.first_response_at.is_none() {
            self.first_response_at = Some(now);
        }
        self.updated_at = now;
    }
}

/// Fields required to insert a ticket; the store assigns id and number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub company_id: Option<Uuid>,
    pub subject: String,
    pub product: String,
    pub issue_type: String,
    pub priority: TicketPriority,
    pub source: TicketSource,
}

/// Render a ticket number as `TKT-NNNN` (zero-padded to at least 4 digits)
pub fn format_ticket_id(ticket_number: i64) -> String {
    format!("{TICKET_PREFIX}-{ticket_number:04}")
}

/// Parse a user-typed ticket reference: `TKT-12`, `tkt-0012` or bare `12`.
pub fn parse_ticket_ref(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let digits = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("TKT-") => &trimmed[4..],
        _ => trimmed,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
