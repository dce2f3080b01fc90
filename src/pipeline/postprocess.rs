//! Cleanup of model output before it is appended to the document.
//!
//! Models often wrap the whole answer in a ```` ```markdown ```` fence even
//! when told not to. [`remove_markdown_wrap`] undoes that;
//! [`clean_markdown`] adds a few whitespace and encoding normalisations.
//!
//! Passes, in order:
//! 1. strip the outer fence
//! 2. CRLF / CR → LF
//! 3. trim trailing whitespace per line
//! 4. collapse 4+ consecutive newlines to 3
//! 5. drop invisible Unicode (zero-width space, BOM, soft hyphen, joiners)

use once_cell::sync::Lazy;
use regex::Regex;

/// Fence language the page prompt asks the model to use.
pub const MARKDOWN_LANG: &str = "markdown";

/// Run every cleanup pass. The result has no leading or trailing whitespace.
///
/// Trailing-whitespace trimming also drops Markdown hard line breaks (two
/// trailing spaces). Call [`remove_markdown_wrap`] alone to keep them.
pub fn clean_markdown(input: &str) -> String {
    let s = remove_markdown_wrap(input, MARKDOWN_LANG);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    remove_invisible_chars(&s).trim().to_string()
}

/// Strip one outer ```` ```lang ```` … ```` ``` ```` wrapper and trim.
///
/// A bare ```` ``` ```` opener is removed only when a closing fence ends the
/// text; a ```` ```lang ```` opener is removed even if the closing fence is
/// missing (the model ran out of tokens). Fences tagged with another
/// language are real content and stay.
pub fn remove_markdown_wrap(text: &str, lang: &str) -> String {
    let trimmed = text.trim();
    let Some(after_ticks) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let Some((tag, body)) = after_ticks.split_once('\n') else {
        return trimmed.to_string();
    };
    let tag = tag.trim();
    let tagged = !tag.is_empty() && tag.eq_ignore_ascii_case(lang);
    if !tag.is_empty() && !tagged {
        return trimmed.to_string();
    }

    let body = body.trim_end();
    match body.strip_suffix("```") {
        Some(inner) => inner.trim().to_string(),
        None if tagged => body.trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_fence() {
        assert_eq!(
            remove_markdown_wrap("```markdown\n# Hello\nWorld\n```", "markdown"),
            "# Hello\nWorld"
        );
        assert_eq!(
            remove_markdown_wrap("  ```Markdown\n# Hello\n```  \n", "markdown"),
            "# Hello"
        );
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(remove_markdown_wrap("```\n# Hello\n```", "markdown"), "# Hello");
    }

    #[test]
    fn keeps_unwrapped_text() {
        assert_eq!(remove_markdown_wrap("\n# Hello\n\n", "markdown"), "# Hello");
        assert_eq!(remove_markdown_wrap("", "markdown"), "");
    }

    #[test]
    fn keeps_fences_of_other_languages() {
        let code = "```python\nprint(1)\n```";
        assert_eq!(remove_markdown_wrap(code, "markdown"), code);
    }

    #[test]
    fn leading_code_block_is_not_a_wrapper() {
        let text = "```\nls -la\n```\n\nSome prose after the block.";
        assert_eq!(remove_markdown_wrap(text, "markdown"), text);
    }

    #[test]
    fn truncated_tagged_fence_is_stripped() {
        assert_eq!(
            remove_markdown_wrap("```markdown\n# Title\ncut off", "markdown"),
            "# Title\ncut off"
        );
    }

    #[test]
    fn inner_fences_survive() {
        let text = "```markdown\n# T\n\n```rust\nfn main() {}\n```\n```";
        assert_eq!(
            remove_markdown_wrap(text, "markdown"),
            "# T\n\n```rust\nfn main() {}\n```"
        );
    }

    #[test]
    fn whitespace_normalisation() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(trim_trailing_whitespace("  a   \nb\t"), "  a\nb");
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn invisible_characters_removed() {
        assert_eq!(
            remove_invisible_chars("a\u{200B}b\u{FEFF}c\u{00AD}d"),
            "abcd"
        );
    }

    #[test]
    fn full_cleanup() {
        let raw = "```markdown\r\n# Title   \r\n\r\n\r\n\r\n\r\nBody\u{200B} text\r\n```";
        assert_eq!(clean_markdown(raw), "# Title\n\n\nBody text");
    }
}
