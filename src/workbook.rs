use std::collections::HashSet;
use std::path::{Component, Path};

use crate::document::DocumentFormat;
use crate::error::{Result, ToolError};
use crate::sheet::{MemoryTable, Sheet, TableStore};

/// Sheet name storing the sheet → document mappings.
pub const METADATA_SHEET: &str = "Metadata";
/// Sheet name prefix for script documents.
pub const SCRIPTS_PREFIX: &str = "Scripts";
/// Sheet name prefix for record documents.
pub const TEXT_PREFIX: &str = "Text";
/// Separator between path components in sheet names.
const PATH_SEPARATOR: char = '>';
/// Excel's limit on worksheet name length.
const MAX_SHEET_NAME: usize = 31;

const METADATA_COLUMNS: [&str; 3] = ["kind", "sheet", "path"];

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub table: MemoryTable,
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

impl WorkbookData {
    /// Looks a table up by sheet name.
    pub fn table(&self, sheet_name: &str) -> Option<&MemoryTable> {
        self.tables
            .iter()
            .find(|table| table.sheet_name == sheet_name)
            .map(|table| &table.table)
    }

    /// Reads the metadata sheet.
    pub fn entries(&self) -> Result<Vec<SheetEntry>> {
        let metadata = self
            .table(METADATA_SHEET)
            .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{METADATA_SHEET}'")))?;
        parse_metadata(metadata)
    }
}

/// Which document a worksheet was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// `script` or `records`.
    pub kind: String,
    pub sheet: String,
    /// Document path relative to its source folder, `/` separated.
    pub path: String,
}

impl SheetEntry {
    /// Resolves the document format, using `separator` for records.
    pub fn format(&self, separator: &str) -> Result<DocumentFormat> {
        match self.kind.as_str() {
            "script" => Ok(DocumentFormat::Script),
            "records" => Ok(DocumentFormat::Records {
                separator: separator.to_string(),
            }),
            other => Err(ToolError::InvalidWorkbook(format!(
                "unknown metadata kind '{other}'"
            ))),
        }
    }
}

/// Accumulates document sheets and assigns their worksheet names.
#[derive(Debug)]
pub struct WorkbookBuilder {
    names: SheetNameRegistry,
    tables: Vec<SheetTable>,
    entries: Vec<SheetEntry>,
}

impl Default for WorkbookBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        let mut names = SheetNameRegistry::default();
        names.claim(METADATA_SHEET.to_string());
        Self {
            names,
            tables: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Adds the sheet of the document at `path`; returns the worksheet name.
    pub fn add(&mut self, sheet: &Sheet, format: &DocumentFormat, path: &str) -> String {
        let sheet_name = self.names.assign(&sheet_name_for(format, path));
        let mut table = MemoryTable::new();
        sheet.write_to(&mut table);

        self.entries.push(SheetEntry {
            kind: format.kind().to_string(),
            sheet: sheet_name.clone(),
            path: path.to_string(),
        });
        self.tables.push(SheetTable {
            sheet_name: sheet_name.clone(),
            table,
        });
        sheet_name
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Finishes the workbook; the metadata sheet comes first.
    pub fn finish(self) -> WorkbookData {
        let rows = self
            .entries
            .into_iter()
            .map(|entry| vec![entry.kind, entry.sheet, entry.path])
            .collect();
        let metadata = SheetTable {
            sheet_name: METADATA_SHEET.to_string(),
            table: MemoryTable::with_rows(&METADATA_COLUMNS, rows),
        };

        let mut tables = vec![metadata];
        tables.extend(self.tables);
        WorkbookData { tables }
    }
}

/// Raw sheet name for a document: `Scripts>dir>name` or `Text>dir>name`,
/// without the file extension.
pub fn sheet_name_for(format: &DocumentFormat, path: &str) -> String {
    let prefix = if format.is_script() {
        SCRIPTS_PREFIX
    } else {
        TEXT_PREFIX
    };
    let stem = Path::new(path).with_extension("");
    let mut name = prefix.to_string();
    for component in stem.components() {
        if let Component::Normal(part) = component {
            name.push(PATH_SEPARATOR);
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

fn parse_metadata(table: &MemoryTable) -> Result<Vec<SheetEntry>> {
    for (column, expected) in METADATA_COLUMNS.iter().enumerate() {
        if table.get_cell(column, 0).map(str::trim) != Some(*expected) {
            return Err(ToolError::InvalidWorkbook(format!(
                "metadata column {column} should be '{expected}'"
            )));
        }
    }

    let mut entries = Vec::new();
    for row in 1..table.height() {
        let cell = |column| table.get_cell(column, row).unwrap_or("").trim().to_string();
        let kind = cell(0);
        if kind.is_empty() {
            continue;
        }
        let entry = SheetEntry {
            kind,
            sheet: cell(1),
            path: cell(2),
        };
        if entry.path.is_empty() {
            return Err(ToolError::MissingMetadata(entry.sheet));
        }
        entries.push(entry);
    }
    Ok(entries)
}

#[derive(Debug, Default)]
struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    fn claim(&mut self, name: String) {
        self.used.insert(name.to_lowercase());
    }

    fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let prefix = truncate_chars(&base, MAX_SHEET_NAME - suffix.len());
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Replaces characters Excel rejects in sheet names and enforces the length
/// limit.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']'];
    let sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches('\'');
    if trimmed.is_empty() {
        return "Sheet".to_string();
    }
    truncate_chars(trimmed, MAX_SHEET_NAME)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Column;

    fn sheet_with_template(template: &str) -> Sheet {
        let mut column = Column::new(crate::sheet::TEMPLATE_COLUMN);
        column.push(template);
        Sheet {
            template: column,
            arguments: Column::new(crate::sheet::ARGUMENTS_COLUMN),
            locales: Vec::new(),
        }
    }

    #[test]
    fn sheet_names_follow_document_paths() {
        assert_eq!(
            sheet_name_for(&DocumentFormat::Script, "chapter1/intro.nani"),
            "Scripts>chapter1>intro"
        );
        let records = DocumentFormat::Records {
            separator: "=".to_string(),
        };
        assert_eq!(sheet_name_for(&records, "ui.txt"), "Text>ui");
    }

    #[test]
    fn long_names_are_truncated_and_deduplicated() {
        let mut builder = WorkbookBuilder::new();
        let sheet = sheet_with_template("; a");
        let first = builder.add(&sheet, &DocumentFormat::Script, "a-very-long-folder-name/first-scene.nani");
        let second = builder.add(&sheet, &DocumentFormat::Script, "a-very-long-folder-name/first-scene-b.nani");

        assert_eq!(first.chars().count(), MAX_SHEET_NAME);
        assert_ne!(first, second);
        assert!(second.ends_with("_1"));
    }

    #[test]
    fn metadata_name_is_reserved() {
        let mut registry = SheetNameRegistry::default();
        registry.claim(METADATA_SHEET.to_string());
        assert_eq!(registry.assign("metadata"), "metadata_1");
    }

    #[test]
    fn invalid_characters_are_replaced() {
        assert_eq!(sanitize_sheet_name("a/b:c?"), "a_b_c_");
        assert_eq!(sanitize_sheet_name("  "), "Sheet");
    }

    #[test]
    fn metadata_maps_sheets_back_to_documents() {
        let mut builder = WorkbookBuilder::new();
        let name = builder.add(&sheet_with_template("; a"), &DocumentFormat::Script, "intro.nani");
        let workbook = builder.finish();

        assert_eq!(workbook.tables[0].sheet_name, METADATA_SHEET);
        let entries = workbook.entries().unwrap();
        assert_eq!(
            entries,
            vec![SheetEntry {
                kind: "script".to_string(),
                sheet: name.clone(),
                path: "intro.nani".to_string(),
            }]
        );
        assert!(workbook.table(&name).is_some());
        assert_eq!(entries[0].format("=").unwrap(), DocumentFormat::Script);
    }

    #[test]
    fn unknown_kind_is_invalid() {
        let entry = SheetEntry {
            kind: "movie".to_string(),
            sheet: "x".to_string(),
            path: "x".to_string(),
        };
        assert!(matches!(entry.format("="), Err(ToolError::InvalidWorkbook(_))));
    }
}
