//! Sender address parsing for inbound mail

use std::sync::LazyLock;

use regex::Regex;

/// `Display Name <addr>` with optional quotes around the name
static NAMED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"?([^"<]*?)"?\s*<([^<>\s]+)>\s*$"#).expect("Invalid named address regex")
});

/// Parsed `From:` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    /// Lowercased address
    pub email: String,
    pub name: Option<String>,
}

/// Parse a `From:` value.
///
/// Unrecognised shapes fall back to the whole trimmed value as the address.
pub fn parse_sender(from: &str) -> Sender {
    if let Some(caps) = NAMED_ADDRESS.captures(from) {
        let name = caps[1].trim();
        return Sender {
            email: caps[2].trim().to_lowercase(),
            name: (!name.is_empty()).then(|| name.to_string()),
        };
    }
    Sender {
        email: from.trim().to_lowercase(),
        name: None,
    }
}

/// Domain part of an address, lowercased
pub fn email_domain(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(domain.to_lowercase())
}
