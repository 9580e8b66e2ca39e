//! Structural tokenizer for command and generic text lines.
//!
//! The tokenizer only records byte ranges; deciding which of them carry
//! translatable text is left to the analyzer.

use std::ops::Range;

use crate::catalog::NAMELESS_PARAMETER;

/// A `name=value` (or nameless) parameter. `value` is the byte range of the
/// value content, excluding surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub id: String,
    pub value: Range<usize>,
}

/// A command, either on its own line or inlined into generic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandToken {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// A piece of a generic text line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(Range<usize>),
    Inline(CommandToken),
}

/// Tokenized form of a command or generic text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Command(CommandToken),
    GenericText {
        author: Option<Range<usize>>,
        segments: Vec<Segment>,
    },
}

/// Tokenizes a `@command` line.
pub fn parse_command_line(text: &str) -> Result<ParsedLine, String> {
    let offset = text.len() - text.trim_start().len();
    let (command, _) = parse_command(text, offset + 1, false)?;
    Ok(ParsedLine::Command(command))
}

/// Tokenizes a generic text line: an optional `Author: ` prefix followed by
/// literal text interleaved with `[inline commands]`.
pub fn parse_generic_line(text: &str) -> Result<ParsedLine, String> {
    let bytes = text.as_bytes();
    let author = author_prefix(text);
    let mut position = author.as_ref().map_or(0, |range| range.end + 2);
    let mut text_start = position;
    let mut segments = Vec::new();

    while position < bytes.len() {
        match bytes[position] {
            b'\\' => position += 2,
            b'[' => {
                if text_start < position {
                    segments.push(Segment::Text(text_start..position));
                }
                let (command, end) = parse_command(text, position + 1, true)?;
                segments.push(Segment::Inline(command));
                position = end;
                text_start = end;
            }
            _ => position += 1,
        }
    }

    if text_start < text.len() {
        segments.push(Segment::Text(text_start..text.len()));
    }

    Ok(ParsedLine::GenericText { author, segments })
}

/// Returns the byte range of an `Author` or `Author.appearance` prefix that
/// is followed by `": "`.
fn author_prefix(text: &str) -> Option<Range<usize>> {
    let end = text.find(": ")?;
    let author = &text[..end];
    let valid = !author.is_empty()
        && author
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    valid.then_some(0..end)
}

/// Parses a command starting at `start` (just past `@` or `[`). Inline
/// commands end at an unquoted `]`; the returned offset points past it.
fn parse_command(text: &str, start: usize, inline: bool) -> Result<(CommandToken, usize), String> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let is_delimiter = |byte: u8| byte.is_ascii_whitespace() || (inline && byte == b']');

    let mut position = start.min(len);
    while position < len && !is_delimiter(bytes[position]) {
        position += 1;
    }
    let name = &text[start.min(len)..position];
    if name.is_empty() {
        return Err("missing command name".to_string());
    }

    let mut parameters = Vec::new();
    loop {
        while position < len && bytes[position].is_ascii_whitespace() {
            position += 1;
        }
        if position >= len {
            if inline {
                return Err("unclosed inline command".to_string());
            }
            break;
        }
        if inline && bytes[position] == b']' {
            position += 1;
            break;
        }

        let mut scan = position;
        while scan < len && !is_delimiter(bytes[scan]) && bytes[scan] != b'=' && bytes[scan] != b'"' {
            scan += 1;
        }
        let (id, value_start) = if scan < len && bytes[scan] == b'=' {
            (text[position..scan].to_string(), scan + 1)
        } else {
            (NAMELESS_PARAMETER.to_string(), position)
        };

        let (value, end) = if value_start < len && bytes[value_start] == b'"' {
            let content_start = value_start + 1;
            let mut cursor = content_start;
            loop {
                match bytes.get(cursor) {
                    None => return Err("unterminated quoted value".to_string()),
                    Some(b'\\') => cursor += 2,
                    Some(b'"') => break,
                    Some(_) => cursor += 1,
                }
            }
            let end = cursor + 1;
            if end < len && !is_delimiter(bytes[end]) {
                return Err("unexpected text after quoted value".to_string());
            }
            (content_start..cursor, end)
        } else {
            let mut cursor = value_start;
            while cursor < len && !is_delimiter(bytes[cursor]) {
                cursor += if bytes[cursor] == b'\\' { 2 } else { 1 };
            }
            let cursor = cursor.min(len);
            (value_start..cursor, cursor)
        };

        parameters.push(Parameter { id, value });
        position = end;
    }

    Ok((
        CommandToken {
            name: name.to_string(),
            parameters,
        },
        position,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(text: &'a str, command: &'a CommandToken) -> Vec<(&'a str, &'a str)> {
        command
            .parameters
            .iter()
            .map(|parameter| (parameter.id.as_str(), &text[parameter.value.clone()]))
            .collect()
    }

    #[test]
    fn command_with_named_and_quoted_parameters() {
        let text = r#"@say text="Hello \"you\"" who=Alice"#;
        let ParsedLine::Command(command) = parse_command_line(text).unwrap() else {
            panic!("expected command");
        };

        assert_eq!(command.name, "say");
        assert_eq!(
            values(text, &command),
            vec![("text", r#"Hello \"you\""#), ("who", "Alice")]
        );
    }

    #[test]
    fn nameless_parameter_has_empty_id() {
        let text = "  @goto .Ending";
        let ParsedLine::Command(command) = parse_command_line(text).unwrap() else {
            panic!("expected command");
        };

        assert_eq!(command.name, "goto");
        assert_eq!(command.parameters[0].id, NAMELESS_PARAMETER);
        assert_eq!(&text[command.parameters[0].value.clone()], ".Ending");
    }

    #[test]
    fn generic_line_splits_text_and_inline_commands() {
        let text = "Alice: Hi [wait 1]there.";
        let ParsedLine::GenericText { author, segments } = parse_generic_line(text).unwrap() else {
            panic!("expected generic text");
        };

        assert_eq!(author, Some(0..5));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text(7..10));
        assert!(matches!(&segments[1], Segment::Inline(command) if command.name == "wait"));
        assert_eq!(segments[2], Segment::Text(18..24));
    }

    #[test]
    fn escaped_brackets_stay_in_text() {
        let text = r"Look \[here\] now";
        let ParsedLine::GenericText { author, segments } = parse_generic_line(text).unwrap() else {
            panic!("expected generic text");
        };

        assert_eq!(author, None);
        assert_eq!(segments, vec![Segment::Text(0..text.len())]);
    }

    #[test]
    fn colon_inside_sentence_is_not_an_author() {
        let text = "Note this: it matters";
        let ParsedLine::GenericText { author, .. } = parse_generic_line(text).unwrap() else {
            panic!("expected generic text");
        };
        assert_eq!(author, None);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(
            parse_command_line(r#"@say text="open"#).unwrap_err(),
            "unterminated quoted value"
        );
        assert_eq!(
            parse_generic_line("Hi [wait 1").unwrap_err(),
            "unclosed inline command"
        );
        assert_eq!(parse_command_line("@").unwrap_err(), "missing command name");
    }
}
