//! Line addressing within text content.
//!
//! Lines are the pieces between `\n` separators and are numbered from 1. A
//! trailing newline therefore produces a final empty line, which keeps
//! [`replace_line`] lossless: joining the pieces back with `\n` reproduces
//! every untouched byte.

/// A single line looked up by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef<'a> {
    /// 1-based line number
    pub number: u64,
    /// Text of the line, without the separator
    pub text: &'a str,
    /// Number of lines in the content
    pub total: usize,
}

/// Result of replacing a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// Content with the line replaced
    pub content: String,
    /// Previous text of the line
    pub previous: String,
    /// Number of lines in the content
    pub total: usize,
}

/// Number of lines in `content`.
pub fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

fn index(line: u64, total: usize) -> Option<usize> {
    let idx = usize::try_from(line).ok()?.checked_sub(1)?;
    (idx < total).then_some(idx)
}

/// Look up line `line` (1-based). Returns `None` when out of range.
pub fn get_line(content: &str, line: u64) -> Option<LineRef<'_>> {
    let total = line_count(content);
    let idx = index(line, total)?;
    let text = content.split('\n').nth(idx)?;
    Some(LineRef {
        number: line,
        text,
        total,
    })
}

/// Replace line `line` (1-based) with `replacement`. Returns `None` when out
/// of range.
pub fn replace_line(content: &str, line: u64, replacement: &str) -> Option<LineEdit> {
    let mut pieces: Vec<&str> = content.split('\n').collect();
    let total = pieces.len();
    let idx = index(line, total)?;
    let previous = std::mem::replace(&mut pieces[idx], replacement).to_string();
    Some(LineEdit {
        content: pieces.join("\n"),
        previous,
        total,
    })
}
