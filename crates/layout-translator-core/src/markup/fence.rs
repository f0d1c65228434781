//! Removal of the code-fence wrapper models put around their HTML.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::unwrap_used)]
static RE_LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*```([A-Za-z]*)\s*").unwrap());

#[allow(clippy::unwrap_used)]
static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

/// Drop leading ```` ```html ```` / ```` ``` ```` markers.
///
/// Returns `""` while a leading marker's language tag may still be arriving
/// (e.g. ```` ```ht ````).
fn strip_leading(mut body: &str) -> &str {
    while let Some(caps) = RE_LEADING_FENCE.captures(body) {
        let end = caps.get(0).map_or(0, |m| m.end());
        let lang = caps.get(1).map_or("", |m| m.as_str());
        let rest = &body[end..];

        if lang.is_empty() || lang.eq_ignore_ascii_case("html") {
            body = rest;
        } else if rest.is_empty() && "html".starts_with(&lang.to_ascii_lowercase()) {
            return "";
        } else {
            break;
        }
    }
    body
}

/// Strip the ```` ```html ```` (or bare ```` ``` ````) markers wrapping a
/// complete answer. Interior content is never touched.
///
/// Idempotent: repeated wrappers at either end are all removed.
pub fn strip_fences(input: &str) -> String {
    let mut body = input;
    while let Some(m) = RE_TRAILING_FENCE.find(body) {
        body = &body[..m.start()];
    }
    strip_leading(body).to_string()
}

/// Fence stripping for output that is still streaming in.
///
/// Trailing whitespace and backticks are held back until something else
/// follows them, so a closing fence split across chunks never flashes on
/// screen. Each call on a longer input yields an extension of the previous
/// result.
pub fn strip_fences_streaming(accumulated: &str) -> String {
    let settled = accumulated.trim_end_matches(|c: char| c == '`' || c.is_whitespace());
    strip_leading(settled).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_input_yields_inner_content() {
        assert_eq!(strip_fences("```html\n<p>Hi</p>\n```"), "<p>Hi</p>");
        assert_eq!(strip_fences("```\n<p>Hi</p>```"), "<p>Hi</p>");
        assert_eq!(strip_fences("```HTML<div></div>```\n"), "<div></div>");
    }

    #[test]
    fn test_unwrapped_input_unchanged() {
        let html = "<div style=\"display:grid\"><p>a</p></div>";
        assert_eq!(strip_fences(html), html);
        assert_eq!(strip_fences("<p>a</p>\n"), "<p>a</p>\n");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "```html\n<p>x</p>\n```",
            "<p>x</p>",
            "```html<p>a</p>",
            "<p>b</p>```",
            "<p>x</p>\n```\n```",
            "```html\n```\n<p>y</p>",
            "```ht```",
            "````",
        ] {
            let once = strip_fences(input);
            assert_eq!(strip_fences(&once), once, "{input}");
        }
    }

    #[test]
    fn test_double_closing_fence() {
        assert_eq!(strip_fences("<p>x</p>\n```\n```"), "<p>x</p>");
    }

    #[test]
    fn test_interior_fences_kept() {
        let html = "<pre>```rust\nfn main() {}\n```</pre><p>end</p>";
        assert_eq!(strip_fences(html), html);
    }

    #[test]
    fn test_partial_leading_marker() {
        assert_eq!(strip_fences("```ht"), "");
        assert_eq!(strip_fences("```html"), "");
        assert_eq!(strip_fences("```html<p>H"), "<p>H");
    }

    #[test]
    fn test_other_language_fence_left_alone() {
        let input = "```json\n{}\n";
        assert_eq!(strip_fences(input), input);
    }

    #[test]
    fn test_streaming_holds_back_split_fences() {
        assert_eq!(strip_fences_streaming("``"), "");
        assert_eq!(strip_fences_streaming("```html<p>"), "<p>");
        assert_eq!(strip_fences_streaming("<p>a</p>\n``"), "<p>a</p>");
        assert_eq!(strip_fences_streaming("<p>a</p>\n```"), "<p>a</p>");
        assert_eq!(strip_fences_streaming("<code>`</code>"), "<code>`</code>");
    }

    #[test]
    fn test_streaming_only_grows() {
        for full in [
            "```html\n<p>a</p>\n```",
            "```html<p>Hi</p></p>```",
            "``` \n<div><code>`x`</code></div>\n```\n```",
            "```json\n{\"a\": 1}\n```",
            "<p>plain</p>\n<p>text</p>",
        ] {
            let cuts: Vec<usize> = (0..=full.len()).filter(|&i| full.is_char_boundary(i)).collect();
            let mut previous = String::new();
            for cut in cuts {
                let visible = strip_fences_streaming(&full[..cut]);
                assert!(
                    visible.starts_with(&previous),
                    "{:?} shrank to {:?} in {full:?}",
                    previous,
                    visible
                );
                previous = visible;
            }
        }
    }

    #[test]
    fn test_streaming_final_matches_complete_strip() {
        let full = "```html\n<p>Hi</p>\n```";
        assert_eq!(strip_fences_streaming(full), strip_fences(full));
        assert_eq!(strip_fences_streaming("```html<p>Hi</p></p>```"), "<p>Hi</p></p>");
    }
}
