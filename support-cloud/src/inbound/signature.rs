//! Resend (svix) webhook signature verification
//!
//! Signed content is `{svix-id}.{svix-timestamp}.{body}`; the `svix-signature`
//! header carries one or more space-separated `v1,<base64 hmac>` entries.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Accepted clock skew between the provider and us, in seconds
const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing webhook signature headers")]
    MissingHeaders,
    #[error("Invalid webhook timestamp")]
    InvalidTimestamp,
    #[error("Webhook timestamp outside tolerance")]
    TimestampOutOfRange,
    #[error("Webhook signature mismatch")]
    Mismatch,
}

/// Headers that accompany a signed delivery
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureHeaders<'a> {
    pub id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

impl<'a> SignatureHeaders<'a> {
    pub fn from_map(headers: &'a http::HeaderMap) -> Self {
        let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            id: get("svix-id"),
            timestamp: get("svix-timestamp"),
            signature: get("svix-signature"),
        }
    }
}

/// Verifier built once from `RESEND_WEBHOOK_SECRET`.
///
/// Without a key every delivery is accepted; `Config` only allows that in
/// development.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Option<Vec<u8>>,
}

impl WebhookVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        let key = secret.filter(|s| !s.is_empty()).map(|s| {
            let raw = s.strip_prefix("whsec_").unwrap_or(s);
            // Secrets that are not base64 are used as raw bytes
            STANDARD
                .decode(raw)
                .unwrap_or_else(|_| raw.as_bytes().to_vec())
        });
        Self { key }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn verify(&self, headers: SignatureHeaders<'_>, body: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())
    }

    /// Verify against an explicit clock (Unix seconds)
    pub fn verify_at(
        &self,
        headers: SignatureHeaders<'_>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let Some(key) = &self.key else {
            tracing::warn!("Webhook secret not configured, skipping signature verification");
            return Ok(());
        };

        let (Some(id), Some(timestamp), Some(signature)) =
            (headers.id, headers.timestamp, headers.signature)
        else {
            return Err(SignatureError::MissingHeaders);
        };

        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        if (now - ts).abs() > TOLERANCE_SECS {
            return Err(SignatureError::TimestampOutOfRange);
        }

        let mut mac =
            Hmac::<Sha256>::new_from_slice(key).map_err(|_| SignatureError::Mismatch)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);

        let matched = signature
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|b64| STANDARD.decode(b64).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Produce a `v1,<base64>` signature entry; used by tests and local tooling.
pub fn sign(key: &[u8], id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(format!("{id}.{timestamp}.").as_bytes());
    mac.update(body);
    format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
}
