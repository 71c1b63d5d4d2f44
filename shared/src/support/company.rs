//! Company model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer organisation, matched to tickets by requester email domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    /// Lowercase email domain, unique
    pub domain: String,
    pub created_at: i64,
}

/// Free mailbox providers; a gmail address says nothing about the employer.
pub const PUBLIC_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "icloud.com",
    "me.com",
    "aol.com",
    "proton.me",
    "protonmail.com",
    "gmx.com",
    "gmx.de",
    "web.de",
];

/// Whether `domain` may be used to auto-associate a company
pub fn is_company_domain(domain: &str) -> bool {
    !domain.is_empty() && !PUBLIC_EMAIL_DOMAINS.contains(&domain)
}
