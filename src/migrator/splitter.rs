//! Semicolon statement splitting for migration files.
//!
//! A `;` only terminates a statement outside of quoted strings, quoted identifiers,
//! dollar-quoted bodies and comments, so `CREATE FUNCTION ... AS $$ ...; ... $$;` stays
//! one statement. Backslash escapes are honored inside `E'...'` escape strings only, as
//! PostgreSQL does with `standard_conforming_strings` on. Segments holding nothing but
//! whitespace or comments are dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
    DollarQuoted,
}

/// Split `sql` into trimmed, non-empty statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Normal;
    let mut dollar_tag: &str = "";
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Normal => match b {
                b';' => {
                    push_statement(&mut statements, &sql[start..i], has_code);
                    start = i + 1;
                    has_code = false;
                }
                b'\'' => {
                    state = if is_escape_string_prefix(bytes, i) {
                        State::EscapeQuoted
                    } else {
                        State::SingleQuoted
                    };
                    has_code = true;
                }
                b'"' => {
                    state = State::DoubleQuoted;
                    has_code = true;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = State::BlockComment;
                    i += 1;
                }
                b'$' => {
                    has_code = true;
                    if let Some(tag) = dollar_tag_at(sql, i) {
                        dollar_tag = tag;
                        state = State::DollarQuoted;
                        i += tag.len() - 1;
                    }
                }
                _ if !b.is_ascii_whitespace() => has_code = true,
                _ => {}
            },
            State::SingleQuoted if b == b'\'' => state = State::Normal,
            State::EscapeQuoted => match b {
                b'\\' => i += 1,
                b'\'' if bytes.get(i + 1) == Some(&b'\'') => i += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted if b == b'"' => state = State::Normal,
            State::LineComment if b == b'\n' => state = State::Normal,
            State::BlockComment if b == b'*' && bytes.get(i + 1) == Some(&b'/') => {
                state = State::Normal;
                i += 1;
            }
            State::DollarQuoted if bytes[i..].starts_with(dollar_tag.as_bytes()) => {
                state = State::Normal;
                i += dollar_tag.len() - 1;
            }
            _ => {}
        }
        i += 1;
    }

    push_statement(&mut statements, &sql[start..], has_code);
    statements
}

fn push_statement(statements: &mut Vec<String>, segment: &str, has_code: bool) {
    let trimmed = segment.trim();
    if has_code && !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Whether the quote at `at` opens an `E'...'` string rather than ending an identifier.
fn is_escape_string_prefix(bytes: &[u8], at: usize) -> bool {
    let Some(prefix) = at.checked_sub(1).map(|p| bytes[p]) else {
        return false;
    };
    let standalone = at < 2 || {
        let before = bytes[at - 2];
        !(before.is_ascii_alphanumeric() || before == b'_' || before == b'$')
    };
    matches!(prefix, b'E' | b'e') && standalone
}

/// The full `$tag$` opener starting at `at`, if there is one.
fn dollar_tag_at(sql: &str, at: usize) -> Option<&str> {
    let rest = &sql[at + 1..];
    let end = rest.find('$')?;
    let tag = &rest[..end];
    let valid = tag.is_empty()
        || (tag
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    valid.then(|| &sql[at..at + end + 2])
}
