//! Conversion between a line of text and its `(template, arguments)` form.
//!
//! A template is the line with every localizable span replaced by a numbered
//! placeholder `{i}`. Literal text that would otherwise read as a placeholder
//! is escaped with a backslash (`\{0\}`), and a backslash that would escape
//! the following character is doubled. Rebuilding consumes those escapes, so
//! `rebuild(template, arguments)` always yields the original line.

use crate::error::{Result, ToolError};

/// A byte range within one line's raw text that holds translatable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizableSpan {
    pub start: usize,
    pub length: usize,
    pub text: String,
}

impl LocalizableSpan {
    /// Creates a span covering `text` at byte offset `start`.
    pub fn new(start: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            start,
            length: text.len(),
            text,
        }
    }

    /// Byte offset one past the end of the span, or `None` when it does
    /// not fit in `usize`.
    pub fn end(&self) -> Option<usize> {
        self.start.checked_add(self.length)
    }
}

/// The `(value, template, arguments)` triple for one line or record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
    pub value: String,
    pub template: String,
    pub arguments: Vec<String>,
}

impl Composite {
    /// Builds a composite from a line and the localizable spans found in it.
    ///
    /// Spans may be supplied in any order. Placeholder indices follow the
    /// left-to-right order of the spans; the text surgery itself runs from the
    /// last span to the first over the untouched input.
    pub fn from_line(text: &str, spans: &[LocalizableSpan]) -> Result<Self> {
        let mut ordered: Vec<&LocalizableSpan> = spans.iter().collect();
        ordered.sort_by_key(|span| (span.start, span.length));
        let ranges = validate_spans(text, &ordered)?;

        let arguments: Vec<String> = ranges
            .iter()
            .map(|&(start, end)| text[start..end].to_string())
            .collect();

        let mut pieces = Vec::with_capacity(ranges.len() * 2 + 1);
        let mut cursor = text.len();
        let mut before_placeholder = false;
        for (index, &(start, end)) in ranges.iter().enumerate().rev() {
            pieces.push(escape_literal(&text[end..cursor], before_placeholder));
            pieces.push(placeholder(index));
            cursor = start;
            before_placeholder = true;
        }
        pieces.push(escape_literal(&text[..cursor], before_placeholder));
        pieces.reverse();

        Ok(Self {
            value: text.to_string(),
            template: pieces.concat(),
            arguments,
        })
    }

    /// Builds a composite from an explicit template and argument list.
    pub fn from_template_and_args(template: impl Into<String>, arguments: Vec<String>) -> Result<Self> {
        let template = template.into();
        let value = rebuild(&template, &arguments)?;
        Ok(Self {
            value,
            template,
            arguments,
        })
    }

    /// Builds a composite from a flat `identifier<separator>value` record.
    ///
    /// Blank lines and lines without the separator are not localizable.
    pub fn from_record(line: &str, separator: &str) -> Self {
        let split = if line.trim().is_empty() || separator.is_empty() {
            None
        } else {
            line.find(separator)
        };

        match split {
            Some(position) => {
                let key_end = position + separator.len();
                Self {
                    value: line.to_string(),
                    template: format!("{}{}", escape_literal(&line[..key_end], true), placeholder(0)),
                    arguments: vec![line[key_end..].to_string()],
                }
            }
            None => Self {
                value: line.to_string(),
                template: escape_literal(line, false),
                arguments: Vec::new(),
            },
        }
    }

    /// Returns whether the composite carries any localizable argument.
    pub fn is_localizable(&self) -> bool {
        !self.arguments.is_empty()
    }
}

/// Replaces every unescaped placeholder in `template` with its argument.
pub fn rebuild(template: &str, arguments: &[String]) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        match ch {
            '\\' => match rest[1..].chars().next() {
                Some(next @ ('{' | '}' | '\\')) => {
                    output.push(next);
                    rest = &rest[2..];
                }
                _ => {
                    output.push('\\');
                    rest = &rest[1..];
                }
            },
            '{' => match parse_placeholder(rest) {
                Some((index, width)) => {
                    let argument = arguments.get(index).ok_or(ToolError::Index {
                        index,
                        len: arguments.len(),
                    })?;
                    output.push_str(argument);
                    rest = &rest[width..];
                }
                None => {
                    output.push('{');
                    rest = &rest[1..];
                }
            },
            other => {
                output.push(other);
                rest = &rest[other.len_utf8()..];
            }
        }
    }

    Ok(output)
}

/// Lists the placeholder indices of a template in the order they appear.
pub fn placeholders(template: &str) -> Vec<usize> {
    let mut indices = Vec::new();
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        match ch {
            '\\' if matches!(rest[1..].chars().next(), Some('{' | '}' | '\\')) => {
                rest = &rest[2..];
            }
            '{' => match parse_placeholder(rest) {
                Some((index, width)) => {
                    indices.push(index);
                    rest = &rest[width..];
                }
                None => rest = &rest[1..],
            },
            other => rest = &rest[other.len_utf8()..],
        }
    }

    indices
}

fn placeholder(index: usize) -> String {
    format!("{{{index}}}")
}

/// Parses `{digits}` at the start of `text`, returning the index and the
/// byte width of the placeholder.
fn parse_placeholder(text: &str) -> Option<(usize, usize)> {
    let body = text.strip_prefix('{')?;
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || body.as_bytes().get(digits) != Some(&b'}') {
        return None;
    }
    let index = body[..digits].parse().unwrap_or(usize::MAX);
    Some((index, digits + 2))
}

/// Escapes literal template text. `before_placeholder` tells whether a
/// placeholder immediately follows the segment, which makes a trailing
/// backslash significant.
fn escape_literal(segment: &str, before_placeholder: bool) -> String {
    let mut escaped = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(ch) = rest.chars().next() {
        match ch {
            '\\' => {
                let significant = match rest[1..].chars().next() {
                    Some('{' | '}' | '\\') => true,
                    Some(_) => false,
                    None => before_placeholder,
                };
                escaped.push_str(if significant { "\\\\" } else { "\\" });
                rest = &rest[1..];
            }
            '{' => match parse_placeholder(rest) {
                Some((_, width)) => {
                    escaped.push_str("\\{");
                    escaped.push_str(&rest[1..width - 1]);
                    escaped.push_str("\\}");
                    rest = &rest[width..];
                }
                None => {
                    escaped.push('{');
                    rest = &rest[1..];
                }
            },
            other => {
                escaped.push(other);
                rest = &rest[other.len_utf8()..];
            }
        }
    }

    escaped
}

/// Checks sorted spans against `text` and returns their byte ranges.
fn validate_spans(text: &str, ordered: &[&LocalizableSpan]) -> Result<Vec<(usize, usize)>> {
    let mut ranges = Vec::with_capacity(ordered.len());
    let mut previous_end = 0;
    for span in ordered {
        let end = span.end();
        let valid = end.is_some_and(|end| {
            span.start >= previous_end
                && end <= text.len()
                && text.is_char_boundary(span.start)
                && text.is_char_boundary(end)
                && text[span.start..end] == span.text
        });
        let Some(end) = end.filter(|_| valid) else {
            return Err(ToolError::InvalidSpan {
                start: span.start,
                end: end.unwrap_or(usize::MAX),
                text: text.to_string(),
            });
        };
        ranges.push((span.start, end));
        previous_end = end;
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_of(text: &str, needle: &str) -> LocalizableSpan {
        let start = text.find(needle).expect("needle present");
        LocalizableSpan::new(start, needle)
    }

    #[test]
    fn comment_line_has_no_arguments() {
        let composite = Composite::from_line("; Hello world", &[]).unwrap();
        assert_eq!(composite.template, "; Hello world");
        assert!(composite.arguments.is_empty());
    }

    #[test]
    fn generic_text_spans_become_ordered_placeholders() {
        let line = "Alice: Hi [wait 1]there.";
        let spans = [span_of(line, "there."), span_of(line, "Hi ")];

        let composite = Composite::from_line(line, &spans).unwrap();

        assert_eq!(composite.template, "Alice: {0}[wait 1]{1}");
        assert_eq!(composite.arguments, vec!["Hi ", "there."]);
        assert_eq!(composite.value, line);
    }

    #[test]
    fn command_parameter_becomes_placeholder() {
        let line = "@say text=Hello who=Alice";
        let composite = Composite::from_line(line, &[span_of(line, "Hello")]).unwrap();

        assert_eq!(composite.template, "@say text={0} who=Alice");
        assert_eq!(composite.arguments, vec!["Hello"]);
    }

    #[test]
    fn record_splits_on_first_separator() {
        let composite = Composite::from_record("greeting=Hello there", "=");
        assert_eq!(composite.template, "greeting={0}");
        assert_eq!(composite.arguments, vec!["Hello there"]);

        let composite = Composite::from_record("formula=a=b", "=");
        assert_eq!(composite.arguments, vec!["a=b"]);
    }

    #[test]
    fn record_without_separator_is_not_localizable() {
        let composite = Composite::from_record("just a heading", "=");
        assert_eq!(composite.template, "just a heading");
        assert!(!composite.is_localizable());

        assert!(!Composite::from_record("   ", "=").is_localizable());
    }

    #[test]
    fn escaped_placeholder_is_literal() {
        let composite = Composite::from_template_and_args(r"\{0\}", Vec::new()).unwrap();
        assert_eq!(composite.value, "{0}");
    }

    #[test]
    fn non_numeric_braces_pass_through() {
        let value = rebuild("score: {points} {0}", &["7".to_string()]).unwrap();
        assert_eq!(value, "score: {points} 7");
    }

    #[test]
    fn out_of_range_placeholder_is_index_error() {
        let err = Composite::from_template_and_args("{0} and {2}", vec!["a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(err, ToolError::Index { index: 2, len: 2 }));
    }

    #[test]
    fn literal_placeholder_text_is_escaped_on_extraction() {
        let line = r"{0} \{1} x";
        let composite = Composite::from_line(line, &[span_of(line, "x")]).unwrap();

        assert_eq!(composite.template, r"\{0\} \\\{1\} {0}");
        assert_eq!(rebuild(&composite.template, &composite.arguments).unwrap(), line);
    }

    #[test]
    fn trailing_backslash_before_placeholder_is_preserved() {
        let line = r"path\name";
        let composite = Composite::from_line(line, &[span_of(line, "name")]).unwrap();

        assert_eq!(composite.template, r"path\\{0}");
        assert_eq!(rebuild(&composite.template, &composite.arguments).unwrap(), line);
    }

    #[test]
    fn overlapping_spans_are_rejected() {
        let line = "abcdef";
        let spans = [LocalizableSpan::new(0, "abcd"), LocalizableSpan::new(2, "cdef")];
        let err = Composite::from_line(line, &spans).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSpan { start: 2, .. }));
    }

    #[test]
    fn spans_must_match_line_text() {
        let err = Composite::from_line("abc", &[LocalizableSpan::new(1, "xy")]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSpan { .. }));

        let err = Composite::from_line("abc", &[LocalizableSpan::new(2, "cd")]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSpan { .. }));

        let err = Composite::from_line("héllo", &[LocalizableSpan {
            start: 2,
            length: 1,
            text: String::new(),
        }])
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidSpan { .. }));
    }

    #[test]
    fn span_length_past_usize_is_invalid() {
        let span = LocalizableSpan {
            start: 2,
            length: usize::MAX,
            text: "c".to_string(),
        };
        assert_eq!(span.end(), None);

        let err = Composite::from_line("abc", &[span]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidSpan { start: 2, end: usize::MAX, .. }));
    }

    #[test]
    fn empty_spans_produce_adjacent_placeholders() {
        let line = r#"text="""#;
        let spans = [LocalizableSpan::new(6, ""), LocalizableSpan::new(6, "")];
        let composite = Composite::from_line(line, &spans).unwrap();

        assert_eq!(composite.template, r#"text="{0}{1}""#);
        assert_eq!(rebuild(&composite.template, &composite.arguments).unwrap(), line);
    }

    #[test]
    fn multibyte_text_round_trips() {
        let line = "Ёжик: Привет [wait 1]мир!";
        let spans = [span_of(line, "Привет "), span_of(line, "мир!")];
        let composite = Composite::from_line(line, &spans).unwrap();

        assert_eq!(composite.template, "Ёжик: {0}[wait 1]{1}");
        assert_eq!(rebuild(&composite.template, &composite.arguments).unwrap(), line);
    }

    /// Every string of up to four characters over an alphabet of braces,
    /// backslashes, digits and letters, under every arrangement of adjacent
    /// and separated spans, rebuilds to itself with dense placeholder indices.
    #[test]
    fn round_trip_holds_for_every_span_layout() {
        const ALPHABET: [char; 5] = ['{', '}', '\\', '0', 'a'];

        for length in 0..=4u32 {
            for code in 0..ALPHABET.len().pow(length) {
                let text: String = (0..length)
                    .map(|position| ALPHABET[code / ALPHABET.len().pow(position) % ALPHABET.len()])
                    .collect();

                for layout in 0..3usize.pow(length) {
                    let spans = spans_for_layout(&text, layout);
                    let composite = Composite::from_line(&text, &spans).unwrap();

                    assert_eq!(
                        rebuild(&composite.template, &composite.arguments).unwrap(),
                        text,
                        "template `{}` for `{text}`",
                        composite.template
                    );
                    let expected: Vec<usize> = (0..spans.len()).collect();
                    assert_eq!(placeholders(&composite.template), expected);
                }
            }
        }
    }

    /// Decodes `layout` as one base-3 digit per character: 0 = literal,
    /// 1 = starts a new span, 2 = extends the current span.
    fn spans_for_layout(text: &str, layout: usize) -> Vec<LocalizableSpan> {
        let mut spans: Vec<LocalizableSpan> = Vec::new();
        let mut open = false;
        let mut code = layout;
        for (offset, ch) in text.char_indices() {
            let digit = code % 3;
            code /= 3;
            match digit {
                1 => {
                    spans.push(LocalizableSpan::new(offset, ch.to_string()));
                    open = true;
                }
                2 if open => {
                    let span = spans.last_mut().expect("open span");
                    span.text.push(ch);
                    span.length = span.text.len();
                }
                _ => open = false,
            }
        }
        spans.reverse();
        spans
    }
}
