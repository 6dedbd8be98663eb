//! Line and indentation helpers over raw document text.

use crate::constants::DEFAULT_INDENT_UNIT;

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset of the `\n` ending the line containing `offset` (or text length).
pub fn line_end(text: &str, offset: usize) -> usize {
    text[offset..].find('\n').map_or(text.len(), |i| offset + i)
}

/// Leading whitespace of the line containing `offset`.
pub fn indent_at(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..line_end(text, start)];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// True when only spaces/tabs precede `offset` on its line.
pub fn starts_line(text: &str, offset: usize) -> bool {
    text[line_start(text, offset)..offset]
        .chars()
        .all(|c| c == ' ' || c == '\t')
}

/// True when the rest of the line after `offset` is blank or a `#` comment.
pub fn rest_of_line_is_trivia(text: &str, offset: usize) -> bool {
    let rest = text[offset..line_end(text, offset)].trim_start();
    rest.is_empty() || rest.starts_with('#')
}

/// 1-based line and column of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let line = text[..offset].matches('\n').count() + 1;
    let column = text[line_start(text, offset)..offset].chars().count() + 1;
    (line, column)
}

/// Line terminator used by the document ("\r\n" if any line uses it).
pub fn newline_style(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Smallest positive indentation step between consecutive non-blank lines.
pub fn indent_unit(text: &str) -> String {
    let mut previous = 0usize;
    let mut unit: Option<usize> = None;
    let mut uses_tabs = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let leading = &line[..line.len() - line.trim_start_matches([' ', '\t']).len()];
        if leading.starts_with('\t') {
            uses_tabs = true;
        }
        let width = leading.len();
        if width > previous {
            let step = width - previous;
            unit = Some(unit.map_or(step, |u| u.min(step)));
        }
        previous = width;
    }

    if uses_tabs {
        return "\t".to_string();
    }
    " ".repeat(unit.unwrap_or(DEFAULT_INDENT_UNIT))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "{\n  a = 1;\n    b = [\n    ];\n}\n";

    #[test]
    fn line_bounds() {
        let b = SAMPLE.find('b').unwrap();
        assert_eq!(&SAMPLE[line_start(SAMPLE, b)..line_end(SAMPLE, b)], "    b = [");
        assert_eq!(line_start(SAMPLE, 0), 0);
        assert_eq!(line_end(SAMPLE, SAMPLE.len()), SAMPLE.len());
    }

    #[test]
    fn indent_of_line() {
        let a = SAMPLE.find('a').unwrap();
        assert_eq!(indent_at(SAMPLE, a), "  ");
        assert!(starts_line(SAMPLE, a));
        assert!(!starts_line(SAMPLE, a + 2));
    }

    #[test]
    fn trivia_detection() {
        let text = "a = 1; # note\nb = 2; c = 3;\n";
        assert!(rest_of_line_is_trivia(text, 6));
        let after_b = text.find("2;").unwrap() + 2;
        assert!(!rest_of_line_is_trivia(text, after_b));
    }

    #[test]
    fn line_col_is_one_based() {
        assert_eq!(line_col("ab\ncd", 0), (1, 1));
        assert_eq!(line_col("ab\ncd", 4), (2, 2));
    }

    #[test]
    fn indent_unit_detects_step() {
        assert_eq!(indent_unit(SAMPLE), "  ");
        assert_eq!(indent_unit("{\n    a = 1;\n}\n"), "    ");
        assert_eq!(indent_unit("{\n\ta = 1;\n}\n"), "\t");
        assert_eq!(indent_unit("{ }"), "  ");
    }

    #[test]
    fn newline_style_prefers_crlf_when_present() {
        assert_eq!(newline_style("a\r\nb"), "\r\n");
        assert_eq!(newline_style("a\nb"), "\n");
    }
}
