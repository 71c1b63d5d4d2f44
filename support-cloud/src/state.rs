//! Application state for support-cloud

use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::auth::RateLimiter;
use crate::config::Config;
use crate::db::PgStore;
use crate::email::{Mailer, ResendMailer};
use crate::inbound::WebhookVerifier;
use crate::storage::{AttachmentStore, S3AttachmentStore};
use crate::store::{BoxError, SupportStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Tickets, messages, companies, SLA settings, staff
    pub store: Arc<dyn SupportStore>,
    /// Outbound customer/staff mail
    pub mailer: Arc<dyn Mailer>,
    /// Attachment object storage
    pub attachments: Arc<dyn AttachmentStore>,
    /// Inbound webhook signature verifier
    pub webhook_verifier: WebhookVerifier,
    /// JWT secret for staff authentication
    pub jwt_secret: String,
    /// Mailbox notified of new tickets
    pub notify_email: Option<String>,
    /// Rate limiter for the public form and login
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = S3Client::new(&aws_config);

        if config.resend_webhook_secret.is_none() {
            tracing::warn!("RESEND_WEBHOOK_SECRET not set, inbound webhooks are unauthenticated");
        }

        Ok(Self {
            store: Arc::new(PgStore::new(pool)),
            mailer: Arc::new(ResendMailer::new(
                &config.resend_api_base,
                &config.resend_api_key,
                &config.support_from_email,
            )),
            attachments: Arc::new(S3AttachmentStore::new(
                s3,
                &config.attachment_s3_bucket,
                &config.attachment_public_base_url,
            )),
            webhook_verifier: WebhookVerifier::new(config.resend_webhook_secret.as_deref()),
            jwt_secret: config.jwt_secret.clone(),
            notify_email: config.support_notify_email.clone(),
            rate_limiter: RateLimiter::new(),
        })
    }
}
