//! Document driver entry points.
//!
//! Pages are converted strictly in order, one model call at a time. The
//! scratch directory holding the staged input and rendered pages lives for
//! the duration of one call and is removed on drop, error paths included.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::llm::LlmClient;
use crate::output::{ConversionOutput, ConversionStats, PageResult};
use crate::pipeline::{input, llm, render};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Convert a PDF or image file on disk.
///
/// # Errors
/// Only fatal problems are returned (missing or unrecognised input, corrupt
/// PDF, empty page range, pdfium unavailable). Pages that fail after all
/// retries are reported in [`ConversionOutput::pages`] and left out of the
/// Markdown.
///
/// ```rust,no_run
/// use markpdfdown::{convert_file, ConversionConfig, LlmClient};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LlmClient::from_env()?;
/// let output = convert_file("report.pdf", &client, &ConversionConfig::default()).await?;
/// print!("{}", output.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert_file(
    path: impl AsRef<Path>,
    client: &LlmClient,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let path = path.as_ref();
    let bytes = input::read_input(path).await?;
    let hint = path.extension().and_then(|e| e.to_str());
    convert_bytes(&bytes, hint, client, config).await
}

/// Convert an in-memory document. `hint_ext` (e.g. `"pdf"`) takes priority
/// over content sniffing.
pub async fn convert_bytes(
    bytes: &[u8],
    hint_ext: Option<&str>,
    client: &LlmClient,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    let scratch = TempDir::new().map_err(|source| ConvertError::Io {
        path: std::env::temp_dir(),
        source,
    })?;

    let staged = input::stage_input(bytes, hint_ext, scratch.path()).await?;
    let worker = render::create_worker(&staged, config.pages, config.max_rendered_pixels)?;

    let render_start = Instant::now();
    let mut images = worker.page_images(scratch.path()).await?;
    images.sort();
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Image conversion completed: {} page(s) in {}ms",
        images.len(),
        render_duration_ms
    );

    let llm_start = Instant::now();
    let pages = process_sequential(client, &images, config).await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let markdown = assemble_document(&pages);
    let processed = pages.iter().filter(|p| p.is_success()).count();
    let stats = ConversionStats {
        provider: client.provider().identity().to_string(),
        model: client.provider().model().to_string(),
        total_pages: pages.len(),
        processed_pages: processed,
        failed_pages: pages.len() - processed,
        render_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    if processed == 0 {
        warn!("No page produced any Markdown");
    }
    info!(
        "Image conversion to Markdown completed: {}/{} pages, {}ms",
        processed, stats.total_pages, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(stats.total_pages, processed);
    }

    // `scratch` is dropped here, removing the staged input and page images.
    Ok(ConversionOutput {
        markdown,
        pages,
        stats,
    })
}

/// Convert `input_path` and write the Markdown to `output_path`.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    client: &LlmClient,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let output = convert_file(input_path, client, config).await?;
    write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Write `markdown` to `path` through a sibling temp file and a rename, so
/// readers never see a half-written file.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), ConvertError> {
    let io_err = |source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(io_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(io_err)?;
    debug!("Wrote {} bytes to {}", markdown.len(), path.display());
    Ok(())
}

async fn process_sequential(
    client: &LlmClient,
    images: &[PathBuf],
    config: &ConversionConfig,
) -> Vec<PageResult> {
    let total = images.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for (i, image) in images.iter().enumerate() {
        let page_num = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total);
        }

        let result = llm::convert_image_to_markdown(client, page_num, image, config).await;

        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_page_complete(page_num, total, result.markdown.len()),
                Some(e) => cb.on_page_error(page_num, total, &e.to_string()),
            }
        }
        results.push(result);
    }
    results
}

/// Each successful page contributes its Markdown followed by a blank line.
fn assemble_document(pages: &[PageResult]) -> String {
    pages
        .iter()
        .filter(|p| p.is_success())
        .fold(String::new(), |mut doc, page| {
            doc.push_str(&page.markdown);
            doc.push_str("\n\n");
            doc
        })
}
