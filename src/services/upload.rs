//! Image uploads — validation and decode to a displayable reference.
//!
//! DESIGN
//! ======
//! Validation is synchronous and happens before anything is scheduled: a
//! file is accepted when its declared content type is `image/*` or its
//! leading bytes carry a PNG, JPEG, GIF or WEBP signature. Decoding turns
//! the bytes into a `data:` URL on the blocking pool, so the session loop
//! never waits on it.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ChatError;

/// A file handed over by the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    /// Content type declared by the picker, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type, bytes }
    }

    /// Read a file from disk, inferring its content type from the extension.
    /// The size is checked against `max_bytes` before anything is read.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file can't be read and `UnsupportedFile` if it
    /// is larger than `max_bytes`.
    pub async fn from_path(path: impl AsRef<Path>, max_bytes: usize) -> Result<Self, ChatError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let len = tokio::fs::metadata(path).await?.len();
        if usize::try_from(len).map_or(true, |len| len > max_bytes) {
            return Err(ChatError::UnsupportedFile(format!("{file_name} is {len} bytes (max {max_bytes})")));
        }
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, mime_from_extension(path).map(str::to_owned), bytes))
    }

    /// Check the upload is an image within `max_bytes` and return its MIME type.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFile` for empty, oversized, or non-image files.
    pub fn validate(&self, max_bytes: usize) -> Result<String, ChatError> {
        if self.bytes.is_empty() {
            return Err(ChatError::UnsupportedFile(format!("{} is empty", self.file_name)));
        }
        if self.bytes.len() > max_bytes {
            return Err(ChatError::UnsupportedFile(format!(
                "{} is {} bytes (max {max_bytes})",
                self.file_name,
                self.bytes.len()
            )));
        }
        let declared = self
            .content_type
            .as_deref()
            .filter(|ct| ct.starts_with("image/"));
        match (declared, sniff_image(&self.bytes)) {
            (Some(ct), _) => Ok(ct.to_owned()),
            (None, Some(sniffed)) => Ok(sniffed.to_owned()),
            (None, None) => Err(ChatError::UnsupportedFile(format!("{} is not an image", self.file_name))),
        }
    }
}

/// MIME type from magic bytes.
#[must_use]
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// MIME type implied by a file extension, for the common image formats.
#[must_use]
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[must_use]
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode on the blocking pool.
///
/// # Errors
///
/// Returns `Io` if the blocking task was cancelled or panicked.
pub async fn decode(mime: String, bytes: Vec<u8>) -> Result<String, ChatError> {
    tokio::task::spawn_blocking(move || to_data_url(&mime, &bytes))
        .await
        .map_err(|e| ChatError::Io(std::io::Error::other(e)))
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
