//! Line normalization for options files.

/// A trimmed, non-comment line of an options file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateLine<'a> {
    /// 1-based line number in the source text.
    pub number: usize,
    pub text: &'a str,
}

/// Lazily yield the candidate lines of `text` in source order.
///
/// Lines are trimmed; empty lines and lines whose first non-blank character
/// is `#` are dropped.
pub fn candidate_lines(text: &str) -> impl Iterator<Item = CandidateLine<'_>> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| CandidateLine {
            number: idx + 1,
            text: line.trim(),
        })
        .filter(|line| !line.text.is_empty() && !line.text.starts_with('#'))
}

/// Cut a trailing `# comment` from a raw value and trim what is left.
///
/// Any `#` ends the value, including one inside quotes.
pub fn strip_inline_comment(value: &str) -> &str {
    match value.find('#') {
        Some(idx) => value[..idx].trim(),
        None => value.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_blank_and_comment_lines() {
        let text = "\n# header\n   \n  steps.doFlag = true  \n\t# indented comment\nflag.file = x\n";
        let lines: Vec<CandidateLine> = candidate_lines(text).collect();
        assert_eq!(
            lines,
            vec![
                CandidateLine {
                    number: 4,
                    text: "steps.doFlag = true"
                },
                CandidateLine {
                    number: 6,
                    text: "flag.file = x"
                },
            ]
        );
    }

    #[test]
    fn test_handles_crlf() {
        let lines: Vec<&str> = candidate_lines("a.b = 1\r\nc.d = 2\r\n")
            .map(|l| l.text)
            .collect();
        assert_eq!(lines, vec!["a.b = 1", "c.d = 2"]);
    }

    #[test]
    fn test_strip_inline_comment() {
        assert_eq!(strip_inline_comment(" 4.0   # sigma"), "4.0");
        assert_eq!(strip_inline_comment("relative"), "relative");
        assert_eq!(strip_inline_comment("#"), "");
        assert_eq!(strip_inline_comment("'a#b'"), "'a");
    }
}
