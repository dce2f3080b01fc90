//! Input acquisition: recognise the document type and stage the bytes as a
//! file in the scratch directory.
//!
//! pdfium needs a file-system path, and the page workers write next to the
//! input, so everything downstream works on `<scratch>/input.<ext>`.

use crate::error::ConvertError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Document types the driver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Pdf,
    Jpeg,
    Png,
    Bmp,
    Gif,
    Webp,
}

impl InputKind {
    /// Extension used when staging (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            InputKind::Pdf => "pdf",
            InputKind::Jpeg => "jpg",
            InputKind::Png => "png",
            InputKind::Bmp => "bmp",
            InputKind::Gif => "gif",
            InputKind::Webp => "webp",
        }
    }

    pub fn is_pdf(self) -> bool {
        self == InputKind::Pdf
    }

    /// Recognise a file extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(InputKind::Pdf),
            "jpg" | "jpeg" => Some(InputKind::Jpeg),
            "png" => Some(InputKind::Png),
            "bmp" => Some(InputKind::Bmp),
            "gif" => Some(InputKind::Gif),
            "webp" => Some(InputKind::Webp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Recognise the leading signature of `bytes`.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(InputKind::Pdf)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(InputKind::Jpeg)
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Some(InputKind::Png)
        } else if bytes.starts_with(b"GIF8") {
            Some(InputKind::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(InputKind::Webp)
        } else if bytes.starts_with(b"BM") {
            Some(InputKind::Bmp)
        } else {
            None
        }
    }

    /// Extension hint first, then the byte signature.
    pub fn detect(bytes: &[u8], hint_ext: Option<&str>) -> Option<Self> {
        if let Some(kind) = hint_ext.and_then(Self::from_extension) {
            return Some(kind);
        }
        let kind = Self::sniff(bytes)?;
        info!("Recognized as {} file by file content", kind);
        Some(kind)
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputKind::Pdf => "PDF",
            InputKind::Jpeg => "JPEG",
            InputKind::Png => "PNG",
            InputKind::Bmp => "BMP",
            InputKind::Gif => "GIF",
            InputKind::Webp => "WebP",
        })
    }
}

/// Write `bytes` to `<scratch_dir>/input.<ext>` and return that path.
pub async fn stage_input(
    bytes: &[u8],
    hint_ext: Option<&str>,
    scratch_dir: &Path,
) -> Result<PathBuf, ConvertError> {
    if bytes.is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    let kind = InputKind::detect(bytes, hint_ext).ok_or_else(|| ConvertError::UnsupportedInput {
        magic: bytes.iter().take(8).copied().collect(),
    })?;

    let path = scratch_dir.join(format!("input.{}", kind.extension()));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| ConvertError::Io {
            path: path.clone(),
            source,
        })?;
    debug!("Staged {} bytes as {}", bytes.len(), path.display());
    Ok(path)
}

/// Read a local input file, mapping a missing file to
/// [`ConvertError::FileNotFound`].
pub async fn read_input(path: &Path) -> Result<Vec<u8>, ConvertError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConvertError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConvertError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
