//! Multipart upload intake: every file part becomes an `UploadedFile`.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::debug;

use crate::errors::AppError;
use crate::models::upload::{is_supported_mime, UploadedFile, PDF_MIME};

/// Browsers send `application/octet-stream` for some images; the extension decides then.
fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "pdf" => Some(PDF_MIME),
        _ => None,
    }
}

pub fn resolve_mime(declared: Option<&str>, file_name: &str) -> Option<String> {
    match declared.map(|m| m.trim().to_ascii_lowercase()) {
        Some(mime) if is_supported_mime(&mime) => Some(mime),
        _ => mime_from_extension(file_name).map(str::to_string),
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

/// Reads every file part. Non-file fields are skipped; any rejected file fails the batch.
pub async fn read_uploads(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            debug!("Skipping non-file multipart field {:?}", field.name());
            continue;
        };

        let mime_type = resolve_mime(field.content_type(), &file_name).ok_or_else(|| {
            AppError::UnsupportedMediaType(format!(
                "{file_name}: only images and PDF documents are supported"
            ))
        })?;

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(AppError::Validation(format!("{file_name} is empty")));
        }
        if data.len() > max_file_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "{file_name} is {} bytes; the limit is {max_file_bytes}",
                data.len()
            )));
        }

        files.push(UploadedFile::new(file_name, mime_type, data));
    }

    if files.is_empty() {
        return Err(AppError::Validation("No files found in upload".to_string()));
    }
    Ok(files)
}
