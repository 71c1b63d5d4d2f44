//! Attachment validation and storage
//!
//! Files are stored at `tickets/{ticket_id|unassigned}/{sha256}-{filename}`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::support::AttachmentRef;

use crate::storage::AttachmentStore;

/// Maximum file size (10MB)
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "txt", "csv", "log", "zip", "docx", "xlsx",
];

/// Keep `[A-Za-z0-9._-]`, replace the rest, and never return an empty name.
pub fn sanitize_filename(name: &str) -> String {
    // Drop any client-side directory part
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

fn extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub fn validate(filename: &str, data: &[u8]) -> Result<(), AppError> {
    if data.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyFile));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::with_message(
            ErrorCode::FileTooLarge,
            format!("File too large: {} bytes (max {MAX_FILE_SIZE})", data.len()),
        ));
    }
    let ext = extension(filename);
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::with_message(
            ErrorCode::InvalidFileExtension,
            format!(
                "Unsupported file type: .{ext}. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        )
        .with_detail("extension", ext));
    }
    Ok(())
}

pub fn object_key(ticket_id: Option<Uuid>, hash: &str, filename: &str) -> String {
    let folder = ticket_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unassigned".to_string());
    format!("tickets/{folder}/{hash}-{filename}")
}

/// Content type from the extension when the client did not send a usable one
fn content_type_for(filename: &str, declared: Option<&str>) -> String {
    if let Some(ct) = declared.filter(|ct| !ct.is_empty() && *ct != "application/octet-stream") {
        return ct.to_string();
    }
    match extension(filename).as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Validate, hash and upload one file
pub async fn store_attachment(
    store: &dyn AttachmentStore,
    ticket_id: Option<Uuid>,
    filename: &str,
    content_type: Option<&str>,
    data: Vec<u8>,
) -> Result<AttachmentRef, AppError> {
    let filename = sanitize_filename(filename);
    validate(&filename, &data)?;

    let hash = hex::encode(Sha256::digest(&data));
    let key = object_key(ticket_id, &hash, &filename);
    let content_type = content_type_for(&filename, content_type);
    let size = data.len() as u64;

    let url = store.put(&key, data, &content_type).await.map_err(|e| {
        tracing::error!(key = %key, error = %e, "Attachment upload failed");
        AppError::new(ErrorCode::FileStorageFailed)
    })?;

    tracing::info!(key = %key, size, "Attachment stored");

    Ok(AttachmentRef {
        filename,
        content_type,
        size,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryAttachmentStore;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report 2026.pdf"), "report_2026.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\scan.png"), "scan.png");
        assert_eq!(sanitize_filename(".."), "file");
    }

    #[test]
    fn test_validate_rules() {
        assert!(validate("a.pdf", b"x").is_ok());
        assert!(validate("A.PDF", b"x").is_ok());
        assert_eq!(validate("a.pdf", b"").unwrap_err().code, ErrorCode::EmptyFile);
        assert_eq!(
            validate("a.exe", b"x").unwrap_err().code,
            ErrorCode::InvalidFileExtension
        );
        let big = vec![0u8; MAX_FILE_SIZE + 1];
        assert_eq!(validate("a.pdf", &big).unwrap_err().code, ErrorCode::FileTooLarge);
    }

    #[test]
    fn test_object_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            object_key(Some(id), "abc", "a.pdf"),
            format!("tickets/{id}/abc-a.pdf")
        );
        assert_eq!(object_key(None, "abc", "a.pdf"), "tickets/unassigned/abc-a.pdf");
    }

    #[tokio::test]
    async fn test_store_attachment_is_content_addressed() {
        let store = MemoryAttachmentStore::default();
        let first = store_attachment(&store, None, "log.txt", None, b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(first.content_type, "text/plain");
        assert_eq!(first.size, 5);
        assert!(first.url.contains(
            "tickets/unassigned/2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824-log.txt"
        ));
        let second = store_attachment(&store, None, "log.txt", None, b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(first.url, second.url);
    }
}
