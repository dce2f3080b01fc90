//! Fixed prompts for page-image transcription.
//!
//! Override either one through [`crate::config::ConversionConfig`]; these
//! constants apply only when no override is set.

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that can convert images to Markdown format. \
You are given an image, and you need to convert it to Markdown format. \
Please output the Markdown content only, without any other text.";

/// Default user prompt sent alongside each page image.
pub const DEFAULT_USER_PROMPT: &str = r#"Below is the image of one page of a document, please read the content in the image and transcribe it into plain Markdown format. Please note:
1. Identify heading levels, text styles, formulas, and the format of table rows and columns
2. Mathematical formulas should be transcribed using LaTeX syntax, ensuring consistency with the original
3. Please output the Markdown content only, without any other text.

Output Example:
```markdown
# Section Title

Body text with **bold** and *italic* words, and an inline formula $E = mc^2$.

| Column A | Column B |
|----------|----------|
| 1        | 2        |
```"#;
