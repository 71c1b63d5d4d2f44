//! Helpdesk domain types shared by the service and its clients

pub mod company;
pub mod message;
pub mod sla;
pub mod ticket;

pub use company::{Company, is_company_domain};
pub use message::{AttachmentRef, Message, NewMessage, SenderType};
pub use sla::{SlaTarget, default_sla_targets};
pub use ticket::{
    NewTicket, Ticket, TicketPriority, TicketSource, TicketStatus, format_ticket_id,
    parse_ticket_ref,
};
