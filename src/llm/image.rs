//! Image helpers shared by every provider.
//!
//! Providers differ in how they ship images (a base64 data-URI inside JSON
//! for OpenAI-compatible APIs, raw bytes plus a mime type for Gemini), but
//! both need the same two facts about a file: its bytes and its mime type.

use crate::error::BackendError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// Mime type used for unknown or missing extensions.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Mime type of an image, looked up from its extension only.
///
/// Pure: the file is never opened, so the path need not exist.
///
/// ```rust
/// use markpdfdown::llm::image::infer_mime_type;
///
/// assert_eq!(infer_mime_type("scan.PNG"), "image/png");
/// assert_eq!(infer_mime_type("page.xyz"), "image/jpeg");
/// ```
pub fn infer_mime_type(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => DEFAULT_IMAGE_MIME,
    }
}

/// Read the whole image file.
pub async fn read_image_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>, BackendError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| BackendError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read image {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Read an image file and return its contents as standard (padded) base64.
pub async fn encode_image_as_base64(path: impl AsRef<Path>) -> Result<String, BackendError> {
    let bytes = read_image_bytes(path).await?;
    Ok(STANDARD.encode(bytes))
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime: &str, base64_payload: &str) -> String {
    format!("data:{mime};base64,{base64_payload}")
}
