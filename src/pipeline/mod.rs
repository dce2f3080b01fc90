//! Stages of the document driver.
//!
//! ```text
//! bytes ──▶ input ──▶ render ──▶ llm ──▶ postprocess
//!          (stage)   (pages)   (retry)  (unwrap fences)
//! ```
//!
//! 1. [`input`]: detect the document type and write `input.<ext>` into
//!    the scratch directory
//! 2. [`render`]: one PNG per selected PDF page, or the image itself
//! 3. [`llm`]: page image to Markdown through the retry wrapper
//! 4. [`postprocess`]: strip the outer fence and normalise whitespace

pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
