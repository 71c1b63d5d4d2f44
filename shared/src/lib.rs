//! Shared types for the support helpdesk
//!
//! Error codes and response structures, plus the ticket/message/company
//! domain model used by the service and the admin console.

pub mod error;
pub mod support;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
