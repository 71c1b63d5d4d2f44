//! Business workflows shared by the HTTP handlers and the inbound pipeline

pub mod analytics;
pub mod attachments;
pub mod companies;
pub mod reports;
pub mod tickets;
