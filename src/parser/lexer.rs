//! Model Line Lexer
//!
//! Classifies physical lines of a model file. Comment stripping happens here
//! so the parser only ever sees statement text.

/// Classification of a single comment-stripped line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind<'a> {
    /// Empty or whitespace-only
    Blank,
    /// Section header like `[node.dam]`, carrying the trimmed inner name
    Header(&'a str),
    /// Property like `area = 12.5`
    KeyValue { key: &'a str, value: &'a str },
    /// Anything else; only meaningful inside `[inputs]` and `[outputs]`
    Bare(&'a str),
}

/// Truncate a line at its first unescaped `;` or `#`
///
/// A backslash escapes the following character and double quotes suspend
/// comment detection until they are closed.
pub fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escape_next = false;

    for (idx, ch) in line.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' => escape_next = true,
            '"' => in_quotes = !in_quotes,
            ';' | '#' if !in_quotes => return &line[..idx],
            _ => {}
        }
    }

    line
}

/// Classify a line that has already been comment-stripped
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    if let Some(name) = header_name(trimmed) {
        return LineKind::Header(name);
    }

    if let Some((key, value)) = trimmed.split_once('=') {
        let key = key.trim();
        if !key.is_empty() {
            return LineKind::KeyValue {
                key,
                value: value.trim(),
            };
        }
    }

    LineKind::Bare(trimmed)
}

/// Whether a raw physical line continues the previous statement
///
/// Continuations are non-empty and start with whitespace. An indented
/// section header still opens a section.
pub fn is_continuation(raw_line: &str) -> bool {
    let starts_indented = raw_line.starts_with([' ', '\t']);
    if !starts_indented {
        return false;
    }

    header_name(strip_comment(raw_line).trim()).is_none()
}

fn header_name(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    let inner = inner.trim();

    if inner.is_empty() || inner.contains([']', '[']) {
        None
    } else {
        Some(inner)
    }
}
