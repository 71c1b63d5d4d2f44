//! Customer and staff notification texts
//!
//! Every customer-facing subject carries `[TKT-NNNN]` so replies thread back
//! onto the ticket.

use shared::support::Ticket;

use super::OutboundEmail;

fn greeting(ticket: &Ticket) -> String {
    match ticket.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hello {name},"),
        None => "Hello,".to_string(),
    }
}

const SIGNATURE: &str = "Kind regards,\nThe Support Team";

const REPLY_HINT: &str =
    "You can reply to this email to add information to your request. Please keep the reference in the subject line.";

pub fn ticket_confirmation(ticket: &Ticket, first_message: &str) -> OutboundEmail {
    let id = ticket.display_id();
    OutboundEmail {
        to: ticket.email.clone(),
        subject: format!("[{id}] We received your request: {}", ticket.subject),
        text: format!(
            "{}\n\n\
             Thank you for contacting us. Your request has been logged as {id} and \
             an engineer will get back to you shortly.\n\n\
             Your message:\n{first_message}\n\n\
             {REPLY_HINT}\n\n{SIGNATURE}",
            greeting(ticket)
        ),
    }
}

pub fn agent_reply(ticket: &Ticket, content: &str, agent_name: &str) -> OutboundEmail {
    OutboundEmail {
        to: ticket.email.clone(),
        subject: format!("Re: [{}] {}", ticket.display_id(), ticket.subject),
        text: format!(
            "{}\n\n{content}\n\n{agent_name}\n\n{REPLY_HINT}",
            greeting(ticket)
        ),
    }
}

pub fn ticket_resolved(ticket: &Ticket) -> OutboundEmail {
    let id = ticket.display_id();
    OutboundEmail {
        to: ticket.email.clone(),
        subject: format!("[{id}] Your request has been resolved: {}", ticket.subject),
        text: format!(
            "{}\n\n\
             We have marked your request {id} as resolved. If the problem persists, \
             simply reply to this email and the ticket will be reopened.\n\n{SIGNATURE}",
            greeting(ticket)
        ),
    }
}

pub fn staff_notification(ticket: &Ticket, to: &str, first_message: &str) -> OutboundEmail {
    let requester = match &ticket.name {
        Some(name) => format!("{name} <{}>", ticket.email),
        None => ticket.email.clone(),
    };
    OutboundEmail {
        to: to.to_string(),
        subject: format!("New ticket [{}]: {}", ticket.display_id(), ticket.subject),
        text: format!(
            "From: {requester}\nSource: {}\nProduct: {}\nIssue type: {}\n\n{first_message}",
            ticket.source.as_db(),
            ticket.product,
            ticket.issue_type,
        ),
    }
}
