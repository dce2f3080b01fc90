//! Per-page conversion events.
//!
//! Attach an implementation through
//! [`crate::config::ConversionConfigBuilder::progress_callback`]. Pages are
//! converted one after another, so hooks are never called concurrently for
//! the same conversion.
//!
//! ```rust
//! use markpdfdown::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Done(AtomicUsize);
//!
//! impl ConversionProgressCallback for Done {
//!     fn on_page_complete(&self, _page: usize, _total: usize, _len: usize) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Done::default()))
//!     .build()
//!     .unwrap();
//! assert!(config.progress_callback.is_some());
//! ```

use std::sync::Arc;

/// Hooks fired by [`crate::convert`]. Every method defaults to a no-op.
///
/// `page_num` is the position of the page image in the conversion order
/// (1-based); `total_pages` is the number of page images produced by the
/// document worker.
pub trait ConversionProgressCallback: Send + Sync {
    /// Page images are ready; nothing has been sent to the model yet.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// `markdown_len` is the byte length of the cleaned page Markdown.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page_num, total_pages, markdown_len);
    }

    /// The page contributed nothing: retries ran out or the model answered
    /// with empty text.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Shared handle stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl EventLog {
        fn push(&self, s: String) {
            self.0.lock().unwrap().push(s);
        }
    }

    impl ConversionProgressCallback for EventLog {
        fn on_conversion_start(&self, total: usize) {
            self.push(format!("start {total}"));
        }
        fn on_page_error(&self, page: usize, total: usize, error: &str) {
            self.push(format!("error {page}/{total}: {error}"));
        }
    }

    #[test]
    fn unimplemented_hooks_are_silent() {
        let log = EventLog::default();
        log.on_conversion_start(2);
        log.on_page_start(1, 2);
        log.on_page_complete(1, 2, 10);
        log.on_page_error(2, 2, "empty");
        log.on_conversion_complete(2, 1);
        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["start 2".to_string(), "error 2/2: empty".to_string()]
        );
    }

    #[test]
    fn noop_as_shared_handle() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(1);
        cb.on_conversion_complete(1, 1);
    }
}
