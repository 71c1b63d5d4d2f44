//! POST /api/attachments: multipart upload → validate → SHA256 → S3
//!
//! Fields: `file` (required), `ticket_id` (optional, scopes the object key).
//! Returns the [`AttachmentRef`] to include in a reply's `attachments`.

use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use shared::error::{AppError, ErrorCode};
use shared::support::AttachmentRef;
use uuid::Uuid;

use crate::auth::StaffIdentity;
use crate::services::attachments::store_attachment;
use crate::services::tickets::load_ticket;
use crate::state::AppState;

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::with_message(ErrorCode::InvalidRequest, format!("Multipart error: {e}"))
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(identity): Extension<StaffIdentity>,
    mut multipart: Multipart,
) -> Result<Json<AttachmentRef>, AppError> {
    let mut file: Option<UploadedFile> = None;
    let mut ticket_id: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?.to_vec();
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("ticket_id") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    ticket_id = Some(Uuid::parse_str(raw).map_err(|_| {
                        AppError::validation("Invalid ticket_id").with_detail("field", "ticket_id")
                    })?);
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::new(ErrorCode::NoFileProvided))?;

    if let Some(id) = ticket_id {
        load_ticket(&state, id).await?;
    }

    let attachment = store_attachment(
        state.attachments.as_ref(),
        ticket_id,
        &file.filename,
        file.content_type.as_deref(),
        file.data,
    )
    .await?;

    tracing::info!(
        staff_id = %identity.staff_id,
        ticket_id = ?ticket_id,
        filename = %attachment.filename,
        "Attachment uploaded"
    );

    Ok(Json(attachment))
}
