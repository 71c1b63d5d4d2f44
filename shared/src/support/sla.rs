//! SLA targets per priority tier

use serde::{Deserialize, Serialize};

use super::ticket::TicketPriority;

/// Target hours for first response and resolution of one priority tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaTarget {
    pub priority: TicketPriority,
    pub first_response_hours: f64,
    pub resolution_hours: f64,
}

impl SlaTarget {
    /// Hours must be positive and first response cannot exceed resolution.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.first_response_hours > 0.0 && self.resolution_hours > 0.0) {
            return Err("SLA hours must be positive");
        }
        if self.first_response_hours > self.resolution_hours {
            return Err("First response target exceeds resolution target");
        }
        Ok(())
    }
}

/// Defaults seeded by the initial migration
pub fn default_sla_targets() -> Vec<SlaTarget> {
    vec![
        SlaTarget {
            priority: TicketPriority::Urgent,
            first_response_hours: 1.0,
            resolution_hours: 4.0,
        },
        SlaTarget {
            priority: TicketPriority::High,
            first_response_hours: 4.0,
            resolution_hours: 24.0,
        },
        SlaTarget {
            priority: TicketPriority::Normal,
            first_response_hours: 8.0,
            resolution_hours: 48.0,
        },
        SlaTarget {
            priority: TicketPriority::Low,
            first_response_hours: 24.0,
            resolution_hours: 120.0,
        },
    ]
}
