//! Fenced code block extraction from completion text.
//!
//! The completion is prose that is expected to carry the PiperFlow notation
//! inside one markdown fence. Unlike JSON extraction, the notation is
//! whitespace-significant, so block content is returned verbatim — only the
//! structural newlines that delimit the fence are removed, nothing is
//! trimmed.

/// Extract every fenced code block from `text`, in order of appearance.
///
/// A fence opens with ``` ``` ``` followed by an optional language hint and a
/// newline, and closes at the next ``` ``` ```. The language hint is
/// discarded. An opening fence without a closing fence is ignored.
///
/// # Examples
///
/// ```
/// use flowpiper::extract::fenced_blocks;
///
/// let text = "Here you go:\n```\ntitle: T\n```\nand also\n```text\nlane: L\n```";
/// assert_eq!(fenced_blocks(text), vec!["title: T", "lane: L"]);
/// ```
pub fn fenced_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(fence_start) = text[search_from..].find("```") {
        let after_backticks = search_from + fence_start + 3;

        // The remainder of the fence line is a language hint; content starts
        // on the next line.
        let Some(line_end) = text[after_backticks..].find('\n') else {
            break;
        };
        let content_start = after_backticks + line_end + 1;

        match text[content_start..].find("```") {
            Some(close_offset) => {
                let raw = &text[content_start..content_start + close_offset];
                blocks.push(strip_closing_newline(raw).to_string());
                search_from = content_start + close_offset + 3;
            }
            // Unclosed fence: nothing after this point can form a block.
            None => break,
        }
    }

    blocks
}

/// The first fenced block in `text`, or `None` when the text contains no
/// complete fence.
///
/// The zero-block case is the caller's to handle — there is no fallback to
/// treating the whole text as notation.
pub fn first_fenced_block(text: &str) -> Option<String> {
    fenced_blocks(text).into_iter().next()
}

/// Remove the newline that separates the last content line from the closing
/// fence. Interior whitespace is preserved untouched.
fn strip_closing_newline(raw: &str) -> &str {
    let raw = raw.strip_suffix('\n').unwrap_or(raw);
    raw.strip_suffix('\r').unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_verbatim() {
        let text = "Sure, here is the diagram:\n```\ntitle: T\nlane: L\n(start) as s\n(end) as e\ns->e\n```\nHope that helps!";
        assert_eq!(
            fenced_blocks(text),
            vec!["title: T\nlane: L\n(start) as s\n(end) as e\ns->e"]
        );
    }

    #[test]
    fn language_hint_discarded() {
        let text = "```piperflow\ntitle: T\n```";
        assert_eq!(fenced_blocks(text), vec!["title: T"]);
    }

    #[test]
    fn interior_whitespace_preserved() {
        let text = "```\n    lane: L\n        (start) as s\n\ns->e\n```";
        assert_eq!(fenced_blocks(text), vec!["    lane: L\n        (start) as s\n\ns->e"]);
    }

    #[test]
    fn zero_blocks_is_none() {
        assert!(first_fenced_block("no fences here at all").is_none());
        assert!(fenced_blocks("no fences here at all").is_empty());
    }

    #[test]
    fn unclosed_fence_is_not_a_block() {
        assert!(first_fenced_block("```\ntitle: T\nno closing fence").is_none());
    }

    #[test]
    fn first_of_many_wins() {
        let text = "```\nfirst\n```\nprose\n```\nsecond\n```";
        assert_eq!(first_fenced_block(text).as_deref(), Some("first"));
        assert_eq!(fenced_blocks(text), vec!["first", "second"]);
    }

    #[test]
    fn crlf_content() {
        let text = "```\r\ntitle: T\r\nlane: L\r\n```";
        assert_eq!(fenced_blocks(text), vec!["title: T\r\nlane: L"]);
    }

    #[test]
    fn surrounding_prose_ignored() {
        let text = "The model explains things first.\n\n```\ns->e\n```\n\nAnd explains more after.";
        assert_eq!(first_fenced_block(text).as_deref(), Some("s->e"));
    }
}
