//! One page image in, one [`PageResult`] out.
//!
//! Failures never propagate: a page whose calls all fail comes back with
//! empty Markdown and a [`PageError`], and the driver moves on.

use crate::config::ConversionConfig;
use crate::error::PageError;
use crate::llm::{try_with_retry, CompletionRequest, LlmClient};
use crate::output::PageResult;
use crate::pipeline::postprocess::clean_markdown;
use crate::prompts::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the completion request for a page image.
pub fn page_request(image: &Path, config: &ConversionConfig) -> CompletionRequest {
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let user = config.user_prompt.as_deref().unwrap_or(DEFAULT_USER_PROMPT);

    CompletionRequest::new(user)
        .with_system_prompt(system)
        .with_image(image)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
}

/// Transcribe `image` through `client` with the configured retry policy.
pub async fn convert_image_to_markdown(
    client: &LlmClient,
    page_num: usize,
    image: &Path,
    config: &ConversionConfig,
) -> PageResult {
    let start = Instant::now();
    info!("Converting image {} to Markdown", image.display());
    let request = page_request(image, config);

    let (markdown, error) = match try_with_retry(client, &request, &config.retry).await {
        Ok(raw) => {
            let markdown = clean_markdown(&raw);
            if markdown.is_empty() {
                warn!("Page {}: model returned no content", page_num);
                (String::new(), Some(PageError::EmptyOutput { page: page_num }))
            } else {
                debug!("Page {}: {} bytes of Markdown", page_num, markdown.len());
                (markdown, None)
            }
        }
        Err(e) => {
            warn!("Page {}: {}", page_num, e);
            let detail = e
                .last_error
                .as_ref()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no attempts were made".to_string());
            (
                String::new(),
                Some(PageError::LlmFailed {
                    page: page_num,
                    attempts: e.attempts,
                    detail,
                }),
            )
        }
    };

    PageResult {
        page_num,
        image_path: image.to_path_buf(),
        markdown,
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    }
}
