//! Result types returned by the conversion entry points.
//!
//! Everything here is `Serialize` so the CLI can emit it with `--json`.

use crate::error::PageError;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome for one page image.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    /// Position in conversion order, 1-based.
    pub page_num: usize,
    pub image_path: PathBuf,
    /// Cleaned Markdown; empty when `error` is set.
    pub markdown: String,
    pub duration_ms: u64,
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.markdown.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    pub provider: String,
    pub model: String,
    /// Page images produced by the document worker.
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Every successful page followed by a blank line, in page order.
    pub markdown: String,
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}
