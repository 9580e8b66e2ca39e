//! Line-oriented documents: scenario scripts and flat key/value records.

use std::collections::HashMap;

use uuid::Uuid;

/// Literal opening a comment line in both document formats.
pub const COMMENT_LITERAL: &str = ";";
/// Literal opening a label line in scripts.
pub const LABEL_LITERAL: &str = "#";
/// Literal opening a command line in scripts.
pub const COMMAND_LITERAL: &str = "@";
/// Number of hex digits kept from a line's content hash.
const HASH_LENGTH: usize = 12;

/// Syntax family of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Scenario script made of labels, comments, commands and text lines.
    Script,
    /// Flat `identifier<separator>value` records.
    Records { separator: String },
}

impl DocumentFormat {
    /// Short identifier used in workbook metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentFormat::Script => "script",
            DocumentFormat::Records { .. } => "records",
        }
    }

    /// Returns whether the format is script-like.
    pub fn is_script(&self) -> bool {
        matches!(self, DocumentFormat::Script)
    }
}

/// Discriminated kind of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    Comment,
    Label,
    Command,
    GenericText,
    Record,
}

/// One line of a document, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    pub kind: LineKind,
    pub text: String,
    /// `"\n"`, `"\r\n"`, or empty for a final unterminated line.
    pub terminator: String,
    /// Stable content hash; the (occurrence-qualified) record identifier for
    /// record lines.
    pub hash: String,
}

impl Line {
    /// Text of a label line.
    pub fn label(&self) -> Option<&str> {
        match self.kind {
            LineKind::Label => strip_literal(&self.text, LABEL_LITERAL),
            _ => None,
        }
    }

    /// Text of a comment line.
    pub fn comment(&self) -> Option<&str> {
        match self.kind {
            LineKind::Comment => strip_literal(&self.text, COMMENT_LITERAL),
            _ => None,
        }
    }

    /// Returns whether the line may hold a translated counterpart.
    pub fn is_structurally_translatable(&self) -> bool {
        matches!(
            self.kind,
            LineKind::Command | LineKind::GenericText | LineKind::Record
        )
    }
}

/// A parsed document together with the identifier callers know it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub format: DocumentFormat,
    pub lines: Vec<Line>,
}

impl Document {
    /// Splits `source` into classified lines.
    pub fn parse(id: impl Into<String>, source: &str, format: DocumentFormat) -> Self {
        let mut hasher = LineHasher::default();
        let mut keys: HashMap<String, usize> = HashMap::new();
        let lines = split_lines(source)
            .into_iter()
            .enumerate()
            .map(|(index, (text, terminator))| {
                let kind = classify(text, &format);
                let hash = match (&format, kind) {
                    (DocumentFormat::Records { separator }, LineKind::Record) => {
                        record_hash(record_key(text, separator), &mut keys)
                    }
                    _ => hasher.hash(text),
                };
                Line {
                    number: index + 1,
                    kind,
                    text: text.to_string(),
                    terminator: terminator.to_string(),
                    hash,
                }
            })
            .collect();

        Self {
            id: id.into(),
            format,
            lines,
        }
    }

    /// Concatenates the lines back into text.
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .flat_map(|line| [line.text.as_str(), line.terminator.as_str()])
            .collect()
    }
}

/// Assigns content hashes, disambiguating identical lines by the order in
/// which they occur.
#[derive(Debug, Default)]
pub struct LineHasher {
    seen: HashMap<String, usize>,
}

impl LineHasher {
    /// Returns the hash for the next occurrence of `text`.
    pub fn hash(&mut self, text: &str) -> String {
        let content = text.trim();
        let occurrence = self.seen.entry(content.to_string()).or_insert(0);
        let hash = content_hash(content, *occurrence);
        *occurrence += 1;
        hash
    }
}

fn content_hash(content: &str, occurrence: usize) -> String {
    let canonical = format!("{content}\u{0}{occurrence}");
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical.as_bytes());
    let mut hash = uuid.simple().to_string();
    hash.truncate(HASH_LENGTH);
    hash
}

/// Splits text into `(line, terminator)` pairs. Concatenating the pairs
/// reproduces the input exactly.
pub fn split_lines(source: &str) -> Vec<(&str, &str)> {
    source
        .split_inclusive('\n')
        .map(|piece| {
            if let Some(text) = piece.strip_suffix("\r\n") {
                (text, "\r\n")
            } else if let Some(text) = piece.strip_suffix('\n') {
                (text, "\n")
            } else {
                (piece, "")
            }
        })
        .collect()
}

/// Determines the kind of a line for the given format.
pub fn classify(text: &str, format: &DocumentFormat) -> LineKind {
    let trimmed = text.trim_start();
    if trimmed.trim_end().is_empty() {
        return LineKind::Empty;
    }
    if trimmed.starts_with(COMMENT_LITERAL) {
        return LineKind::Comment;
    }

    match format {
        DocumentFormat::Script if trimmed.starts_with(LABEL_LITERAL) => LineKind::Label,
        DocumentFormat::Script if trimmed.starts_with(COMMAND_LITERAL) => LineKind::Command,
        DocumentFormat::Script => LineKind::GenericText,
        DocumentFormat::Records { separator } if !separator.is_empty() && text.contains(separator.as_str()) => {
            LineKind::Record
        }
        DocumentFormat::Records { .. } => LineKind::GenericText,
    }
}

/// The record identifier; repeated identifiers get a `#<occurrence>`
/// suffix so that the n-th repeat aligns with the n-th translated repeat.
fn record_hash(key: &str, seen: &mut HashMap<String, usize>) -> String {
    let occurrence = seen.entry(key.to_string()).or_insert(0);
    let hash = match *occurrence {
        0 => key.to_string(),
        repeat => format!("{key}#{repeat}"),
    };
    *occurrence += 1;
    hash
}

fn record_key<'a>(text: &'a str, separator: &str) -> &'a str {
    text.find(separator).map_or(text, |position| &text[..position])
}

fn strip_literal<'a>(text: &'a str, literal: &str) -> Option<&'a str> {
    text.trim_start().strip_prefix(literal).map(str::trim)
}
