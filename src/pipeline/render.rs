//! Document workers: turn the staged input into one image file per page.
//!
//! PDFs are rasterised with pdfium inside `spawn_blocking`, since pdfium is
//! synchronous and CPU-bound. Each page is capped at `max_rendered_pixels`
//! on its longest edge. Images pass through untouched as a single page.

use crate::config::PageRange;
use crate::error::ConvertError;
use crate::pipeline::input::InputKind;
use async_trait::async_trait;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Explicit path to the pdfium shared library.
pub const PDFIUM_LIB_PATH: &str = "PDFIUM_LIB_PATH";

/// Produces the page images for one document.
#[async_trait]
pub trait DocumentWorker: Send + Sync {
    /// Write (or locate) page images under `scratch` and return their paths
    /// in page order.
    async fn page_images(&self, scratch: &Path) -> Result<Vec<PathBuf>, ConvertError>;
}

/// Pick the worker for `path` by its extension.
pub fn create_worker(
    path: &Path,
    range: PageRange,
    max_rendered_pixels: u32,
) -> Result<Box<dyn DocumentWorker>, ConvertError> {
    match InputKind::from_path(path) {
        Some(InputKind::Pdf) => Ok(Box::new(PdfWorker {
            path: path.to_path_buf(),
            range,
            max_rendered_pixels,
        })),
        Some(_) => Ok(Box::new(ImageWorker {
            path: path.to_path_buf(),
            range,
        })),
        None => Err(ConvertError::UnsupportedInput { magic: Vec::new() }),
    }
}

/// File name for the rendered image of 1-based page `page`.
pub fn page_file_name(page: usize) -> String {
    format!("page_{page:04}.png")
}

fn out_of_range(range: PageRange, total: usize) -> ConvertError {
    ConvertError::PageOutOfRange {
        start: range.start,
        end: range.end.unwrap_or(total),
        total,
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PdfWorker {
    path: PathBuf,
    range: PageRange,
    max_rendered_pixels: u32,
}

#[async_trait]
impl DocumentWorker for PdfWorker {
    async fn page_images(&self, scratch: &Path) -> Result<Vec<PathBuf>, ConvertError> {
        let path = self.path.clone();
        let out_dir = scratch.to_path_buf();
        let range = self.range;
        let max_px = self.max_rendered_pixels;

        tokio::task::spawn_blocking(move || render_blocking(&path, &out_dir, range, max_px))
            .await
            .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))?
    }
}

/// Bind pdfium from `PDFIUM_LIB_PATH`, else from the working directory or
/// the system library search path.
fn bind_pdfium() -> Result<Pdfium, ConvertError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH) {
        Ok(lib) if !lib.trim().is_empty() => {
            debug!("Binding pdfium from {}", lib);
            Pdfium::bind_to_library(lib.trim())
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ConvertError::PdfiumUnavailable(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

fn render_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    range: PageRange,
    max_px: u32,
) -> Result<Vec<PathBuf>, ConvertError> {
    let pdfium = bind_pdfium()?;
    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| ConvertError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let indices = range.to_indices(total);
    if indices.is_empty() {
        return Err(out_of_range(range, total));
    }
    info!(
        "PDF loaded: {} pages, rendering {} ({})",
        total,
        indices.len(),
        range
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_px as i32)
        .set_maximum_height(max_px as i32);

    let mut written = Vec::with_capacity(indices.len());
    for idx in indices {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| ConvertError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ConvertError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        let target = out_dir.join(page_file_name(page_num));
        image
            .save_with_format(&target, ImageFormat::Png)
            .map_err(|e| ConvertError::RasterisationFailed {
                page: page_num,
                detail: e.to_string(),
            })?;
        debug!(
            "Rendered page {} → {}x{} px at {}",
            page_num,
            image.width(),
            image.height(),
            target.display()
        );
        written.push(target);
    }

    Ok(written)
}

// ── Single image ─────────────────────────────────────────────────────────

/// A standalone image is its own single page.
#[derive(Debug)]
pub struct ImageWorker {
    path: PathBuf,
    range: PageRange,
}

#[async_trait]
impl DocumentWorker for ImageWorker {
    async fn page_images(&self, _scratch: &Path) -> Result<Vec<PathBuf>, ConvertError> {
        if self.range.to_indices(1).is_empty() {
            return Err(out_of_range(self.range, 1));
        }
        Ok(vec![self.path.clone()])
    }
}
