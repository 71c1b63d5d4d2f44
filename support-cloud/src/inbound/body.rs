//! Message body extraction
//!
//! Providers deliver the body in different places depending on the sending
//! client. [`BODY_RULES`] is tried in order; the first rule that yields
//! non-empty text wins and the last rule always succeeds.

use std::sync::LazyLock;

use regex::Regex;

use super::{InboundAttachment, ReceivedEmail};

/// Stored when no rule finds usable content
pub const FALLBACK_BODY: &str = "[No message content could be extracted from this email]";

static QUOTE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^On\s.+\swrote:\s*$").expect("Invalid quote header regex"));
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(_{3,}|-{3,})\s*$").expect("Invalid separator regex"));
static INVISIBLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|head)[^>]*>.*?</(script|style|head)>")
        .expect("Invalid block regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid ws regex"));

/// Body text plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBody {
    pub text: String,
    /// Name of the rule that produced the text
    pub rule: &'static str,
    /// Attachment index the body was read from, if any
    pub consumed_attachment: Option<usize>,
}

pub struct BodyRule {
    pub name: &'static str,
    extract: fn(&ReceivedEmail) -> Option<(String, Option<usize>)>,
}

pub static BODY_RULES: &[BodyRule] = &[
    BodyRule {
        name: "text",
        extract: from_text,
    },
    BodyRule {
        name: "html",
        extract: from_html,
    },
    BodyRule {
        name: "text_attachment",
        extract: from_text_attachment,
    },
    BodyRule {
        name: "html_attachment",
        extract: from_html_attachment,
    },
    BodyRule {
        name: "fallback",
        extract: fallback,
    },
];

/// Run the rules in order
pub fn extract_body(email: &ReceivedEmail) -> ExtractedBody {
    for rule in BODY_RULES {
        if let Some((text, consumed_attachment)) = (rule.extract)(email)
            && !text.trim().is_empty()
        {
            return ExtractedBody {
                text,
                rule: rule.name,
                consumed_attachment,
            };
        }
    }
    ExtractedBody {
        text: FALLBACK_BODY.to_string(),
        rule: "fallback",
        consumed_attachment: None,
    }
}

fn from_text(email: &ReceivedEmail) -> Option<(String, Option<usize>)> {
    let text = email.text.as_deref()?;
    Some((clean_reply_text(text), None))
}

fn from_html(email: &ReceivedEmail) -> Option<(String, Option<usize>)> {
    let html = email.html.as_deref()?;
    Some((strip_html(html), None))
}

fn from_text_attachment(email: &ReceivedEmail) -> Option<(String, Option<usize>)> {
    let (index, text) = find_attachment(&email.attachments, "text/plain", "body.txt")?;
    Some((clean_reply_text(&text), Some(index)))
}

fn from_html_attachment(email: &ReceivedEmail) -> Option<(String, Option<usize>)> {
    let (index, html) = find_attachment(&email.attachments, "text/html", "body.html")?;
    Some((strip_html(&html), Some(index)))
}

fn fallback(_: &ReceivedEmail) -> Option<(String, Option<usize>)> {
    Some((FALLBACK_BODY.to_string(), None))
}

/// First attachment matching the content type or the well-known filename that
/// decodes to UTF-8 text.
fn find_attachment(
    attachments: &[InboundAttachment],
    content_type: &str,
    filename: &str,
) -> Option<(usize, String)> {
    attachments.iter().enumerate().find_map(|(index, att)| {
        let type_matches = att
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(content_type));
        let name_matches = att
            .filename
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(filename));
        if !(type_matches || name_matches) {
            return None;
        }
        let bytes = att.decode()?;
        String::from_utf8(bytes).ok().map(|text| (index, text))
    })
}

/// Drop quoted history from a reply.
///
/// Everything from the first quote marker onward is removed: an `On … wrote:`
/// line, a `>` quoted line, `From:`/`Sent:` headers, an underscore or dash
/// separator, or an `Original Message` banner.
pub fn clean_reply_text(text: &str) -> String {
    let mut kept = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if QUOTE_HEADER.is_match(trimmed)
            || trimmed.starts_with('>')
            || trimmed.starts_with("From:")
            || trimmed.starts_with("Sent:")
            || SEPARATOR.is_match(line)
            || line.contains("Original Message")
        {
            break;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}

/// Reduce HTML to plain text: invisible blocks and tags removed, common
/// entities decoded, whitespace collapsed to single spaces.
pub fn strip_html(html: &str) -> String {
    let without_blocks = INVISIBLE_BLOCK.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_blocks, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        // Last so `&amp;lt;` stays `&lt;`
        .replace("&amp;", "&")
}
