//! Message attachment policy and blob storage trait.
//!
//! Attachments are not a table of their own: an uploaded file is written to
//! a [`BlobStore`] and the resulting public URL becomes the content of a
//! non-text message.

use async_trait::async_trait;

use super::message::MessageType;
use crate::shared::error::AppError;

/// Maximum file size in bytes (10 MiB).
pub const MAX_ATTACHMENT_SIZE: usize = 10 * 1024 * 1024;

/// Allowed extensions, the MIME types accepted for each, and the message kind.
const ALLOWED: &[(&str, &[&str], MessageType)] = &[
    ("jpeg", &["image/jpeg"], MessageType::Image),
    ("jpg", &["image/jpeg"], MessageType::Image),
    ("png", &["image/png"], MessageType::Image),
    ("gif", &["image/gif"], MessageType::Image),
    ("mp4", &["video/mp4"], MessageType::Video),
    ("mov", &["video/quicktime"], MessageType::Video),
    ("avi", &["video/x-msvideo", "video/avi", "video/msvideo"], MessageType::Video),
    ("mp3", &["audio/mpeg", "audio/mp3"], MessageType::Audio),
    ("ogg", &["audio/ogg", "application/ogg"], MessageType::Audio),
    ("wav", &["audio/wav", "audio/x-wav", "audio/wave"], MessageType::Audio),
    ("pdf", &["application/pdf"], MessageType::Document),
    ("doc", &["application/msword"], MessageType::Document),
    (
        "docx",
        &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
        MessageType::Document,
    ),
    ("xls", &["application/vnd.ms-excel"], MessageType::Document),
    (
        "xlsx",
        &["application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"],
        MessageType::Document,
    ),
    ("ppt", &["application/vnd.ms-powerpoint"], MessageType::Document),
    (
        "pptx",
        &["application/vnd.openxmlformats-officedocument.presentationml.presentation"],
        MessageType::Document,
    ),
    ("txt", &["text/plain"], MessageType::Document),
];

/// An upload that passed the policy checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedUpload {
    /// Lower-cased extension without the dot
    pub extension: String,
    /// Message kind inferred from the extension
    pub message_type: MessageType,
}

/// Check an upload against the size limit and the extension/content-type
/// allow-list. A missing content type is judged on the extension alone.
pub fn validate_upload(
    filename: &str,
    content_type: Option<&str>,
    size: usize,
    max_size: usize,
) -> Result<AcceptedUpload, AppError> {
    if size == 0 {
        return Err(AppError::InvalidArgument("Uploaded file is empty".into()));
    }
    if size > max_size {
        return Err(AppError::InvalidArgument(format!(
            "File too large: {} bytes (max {} bytes)",
            size, max_size
        )));
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| AppError::InvalidArgument("File type not allowed".into()))?;

    let (_, mimes, message_type) = ALLOWED
        .iter()
        .find(|(ext, _, _)| *ext == extension)
        .ok_or_else(|| {
            AppError::InvalidArgument(format!("File type not allowed: .{}", extension))
        })?;

    if let Some(ct) = content_type {
        // Drop parameters such as "; charset=utf-8"
        let essence = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if !mimes.contains(&essence.as_str()) {
            return Err(AppError::InvalidArgument(format!(
                "Content type {} does not match .{}",
                essence, extension
            )));
        }
    }

    Ok(AcceptedUpload {
        extension,
        message_type: *message_type,
    })
}

/// External blob storage for attachment bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL for it.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, AppError>;
}
