use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Serialize;

pub const PDF_MIME: &str = "application/pdf";

/// A document or image the user attached. Held in memory only; dropped on reset.
///
/// Clones share the payload, so handing files to a run copies no bytes.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
    /// Inline-data payload sent to the model.
    pub base64: Arc<str>,
}

/// What clients see of an upload. The payload is served separately by index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub is_image: bool,
}

impl UploadedFile {
    pub fn new(file_name: String, mime_type: String, data: Bytes) -> Self {
        let base64 = Arc::from(STANDARD.encode(&data));
        Self {
            file_name,
            mime_type,
            data,
            base64,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size(),
            is_image: self.is_image(),
        }
    }
}

/// Images of any kind and PDFs are accepted.
pub fn is_supported_mime(mime_type: &str) -> bool {
    let mime_type = mime_type.trim().to_ascii_lowercase();
    (mime_type.starts_with("image/") && mime_type.len() > "image/".len()) || mime_type == PDF_MIME
}
