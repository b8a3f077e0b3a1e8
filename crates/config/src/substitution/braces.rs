//! Locating top-level `{...}` spans.

/// A top-level placeholder span. `start..end` covers the outer braces,
/// `inner` is the text between them with nested braces kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub start: usize,
    pub end: usize,
    pub inner: &'a str,
}

/// Find every top-level span, left to right, without overlap.
///
/// A backslash escapes the character after it. An opener that is never
/// closed produces no span and scanning resumes right after it.
pub fn locate(text: &str) -> Vec<Span<'_>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'{' => match closing_brace(bytes, i) {
                Some(close) => {
                    spans.push(Span {
                        start: i,
                        end: close + 1,
                        inner: &text[i + 1..close],
                    });
                    i = close + 1;
                },
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    spans
}

/// Offset of the brace closing the one at `open`, if any.
///
/// Only ASCII bytes are compared, so multi-byte characters never match and
/// returned offsets always sit on char boundaries.
fn closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            },
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            },
            _ => {},
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inners(text: &str) -> Vec<&str> {
        locate(text).into_iter().map(|span| span.inner).collect()
    }

    #[test]
    fn plain_text_has_no_spans() {
        assert!(locate("hello world").is_empty());
        assert!(locate("").is_empty());
    }

    #[test]
    fn finds_spans_with_offsets() {
        let spans = locate("a {env:X} b {posargs}");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], Span {
            start: 2,
            end: 9,
            inner: "env:X",
        });
        assert_eq!(spans[1].inner, "posargs");
        assert_eq!(&"a {env:X} b {posargs}"[spans[1].start..spans[1].end], "{posargs}");
    }

    #[test]
    fn nested_braces_stay_in_one_span() {
        assert_eq!(inners("{env:A:{env:B}}"), vec!["env:A:{env:B}"]);
    }

    #[test]
    fn adjacent_spans() {
        assert_eq!(inners("{/}{/}"), vec!["/", "/"]);
    }

    #[test]
    fn escaped_braces_are_skipped() {
        assert!(locate(r"literal \{brace\}").is_empty());
        assert_eq!(inners(r"{a\}b}"), vec![r"a\}b"]);
    }

    #[test]
    fn unclosed_opener_resumes_after_it() {
        assert_eq!(inners("{a {b}"), vec!["b"]);
        assert!(locate("{never").is_empty());
    }

    #[test]
    fn empty_braces_are_a_span() {
        assert_eq!(inners("{}"), vec![""]);
    }

    #[test]
    fn multibyte_text_keeps_char_boundaries() {
        let text = "é{ü}ß";
        let spans = locate(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].inner, "ü");
        assert_eq!(&text[spans[0].start..spans[0].end], "{ü}");
    }

    #[test]
    fn trailing_backslash() {
        assert!(locate("abc\\").is_empty());
        assert!(locate("{abc\\").is_empty());
    }
}
