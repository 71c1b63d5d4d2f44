//! Service configuration

use crate::store::BoxError;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Resend API key for outbound mail
    pub resend_api_key: String,
    /// Resend REST base URL (overridable for local mocks)
    pub resend_api_base: String,
    /// Signing secret of the inbound webhook (`whsec_...`); optional in development only
    pub resend_webhook_secret: Option<String>,
    /// Sender and reply-to address of outbound mail
    pub support_from_email: String,
    /// Mailbox notified of new tickets, if any
    pub support_notify_email: Option<String>,
    /// JWT secret for staff authentication
    pub jwt_secret: String,
    /// S3 bucket for ticket attachments
    pub attachment_s3_bucket: String,
    /// Public (CDN) base URL of the attachment bucket
    pub attachment_public_base_url: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Webhook secret: unsigned deliveries are only acceptable in development.
    fn webhook_secret(environment: &str) -> Result<Option<String>, BoxError> {
        let secret = std::env::var("RESEND_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        if secret.is_none() && environment != "development" {
            return Err(
                format!("RESEND_WEBHOOK_SECRET must be set in {environment} environment").into(),
            );
        }
        Ok(secret)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            resend_api_key: Self::require_secret("RESEND_API_KEY", &environment)?,
            resend_api_base: std::env::var("RESEND_API_BASE")
                .unwrap_or_else(|_| "https://api.resend.com".into()),
            resend_webhook_secret: Self::webhook_secret(&environment)?,
            support_from_email: std::env::var("SUPPORT_FROM_EMAIL")
                .unwrap_or_else(|_| "support@example.com".into()),
            support_notify_email: std::env::var("SUPPORT_NOTIFY_EMAIL")
                .ok()
                .filter(|s| !s.is_empty()),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            attachment_s3_bucket: std::env::var("ATTACHMENT_S3_BUCKET")
                .unwrap_or_else(|_| "support-attachments".into()),
            attachment_public_base_url: std::env::var("ATTACHMENT_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "https://support-attachments.s3.amazonaws.com".into()),
            environment,
        })
    }
}
