//! Ticket reference extraction from reply subjects

use std::sync::LazyLock;

use regex::Regex;

static TICKET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[TKT-(\d+)\]").expect("Invalid ticket tag regex"));

/// Number embedded as `[TKT-<digits>]`, the tag every outbound mail carries.
pub fn extract_ticket_number(subject: &str) -> Option<i64> {
    TICKET_TAG
        .captures(subject)
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_in_reply_subject() {
        assert_eq!(
            extract_ticket_number("Re: [TKT-0042] Press line stopped"),
            Some(42)
        );
        assert_eq!(extract_ticket_number("[TKT-7]"), Some(7));
    }

    #[test]
    fn test_malformed_tags_ignored() {
        assert_eq!(extract_ticket_number("[TKT-abc] hello"), None);
        assert_eq!(extract_ticket_number("About TKT-123"), None);
        assert_eq!(extract_ticket_number("[tkt-12]"), None);
        assert_eq!(extract_ticket_number("New request"), None);
    }
}
