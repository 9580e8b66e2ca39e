use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool extracts, aligns, or rebuilds localizable text.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing fails for the catalog or project config.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a line references a command or parameter the metadata
    /// catalog does not know about.
    #[error("{}", schema_message(.command, .parameter.as_deref()))]
    Schema {
        command: String,
        parameter: Option<String>,
    },

    /// Raised when a line fails structural tokenization.
    #[error("failed to parse line {line} ({reason}): `{text}`")]
    Parse {
        line: usize,
        text: String,
        reason: String,
    },

    /// Raised when a translated counterpart carries a different number of
    /// arguments than its source line.
    #[error(
        "argument count mismatch in {document} at line {line}: source has {expected}, {translation} has {found}"
    )]
    Alignment {
        document: String,
        translation: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Raised when no marker in a translated document matches a source line.
    #[error("missing localization in {document} for line {line}: `{text}`")]
    MissingLocalization {
        document: String,
        line: usize,
        text: String,
    },

    /// Raised when a translated document does not declare its locale tag.
    #[error("no `<tag>` header comment found in translated document {0}")]
    LocaleTag(String),

    /// Raised when a template references a placeholder the argument list
    /// cannot satisfy.
    #[error("placeholder index {index} is out of range for {len} argument(s)")]
    Index { index: usize, len: usize },

    /// Raised when localizable spans are out of bounds or overlap.
    #[error("invalid localizable span {start}..{end} in `{text}`")]
    InvalidSpan {
        start: usize,
        end: usize,
        text: String,
    },

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a required sheet or mapping entry is missing.
    #[error("missing metadata entry for sheet {0}")]
    MissingMetadata(String),

    /// Raised when the project configuration is incomplete.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ToolError {
    /// Builds a schema error for an unknown command.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        ToolError::Schema {
            command: command.into(),
            parameter: None,
        }
    }

    /// Builds a schema error for an unknown parameter of a known command.
    pub fn unknown_parameter(command: impl Into<String>, parameter: impl Into<String>) -> Self {
        ToolError::Schema {
            command: command.into(),
            parameter: Some(parameter.into()),
        }
    }
}

fn schema_message(command: &str, parameter: Option<&str>) -> String {
    match parameter {
        Some("") => format!("command `{command}` has no nameless parameter in the catalog"),
        Some(parameter) => {
            format!("parameter `{parameter}` of command `{command}` is not in the catalog")
        }
        None => format!("command `{command}` is not in the catalog"),
    }
}
