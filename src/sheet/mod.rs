//! Row-aligned tables of templates, source arguments and translated
//! arguments.
//!
//! Each source line with arguments becomes a run of `argument count` rows;
//! the Template cell is set on the first row of the run only. Lines without
//! arguments are coalesced into the Template cell of the next run, or into a
//! final Template-only row at the end of the document.

pub mod store;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::align::{LocaleTagCache, find_counterpart};
use crate::composite::{Composite, placeholders};
use crate::document::{COMMENT_LITERAL, Document, DocumentFormat, LABEL_LITERAL, Line, LineHasher, split_lines};
use crate::error::{Result, ToolError};
use crate::script::LineAnalyzer;

pub use store::{MemoryTable, TableStore};

/// Header of the column holding templates.
pub const TEMPLATE_COLUMN: &str = "Template";
/// Header of the column holding source arguments.
pub const ARGUMENTS_COLUMN: &str = "Arguments";

/// An ordered, append-only sequence of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    values: Vec<String>,
}

impl Column {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Cell at `row`; rows past the end read as empty.
    pub fn get(&self, row: usize) -> &str {
        self.values.get(row).map_or("", String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columns sharing one row index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub template: Column,
    pub arguments: Column,
    pub locales: Vec<Column>,
}

/// Contiguous rows belonging to one Template cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub rows: usize,
}

impl Sheet {
    /// All columns in header order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        [&self.template, &self.arguments]
            .into_iter()
            .chain(self.locales.iter())
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.columns().map(Column::len).max().unwrap_or(0)
    }

    /// Splits the rows into runs: a non-empty Template cell starts a run that
    /// lasts until the next non-empty Template cell or the end of the table.
    pub fn runs(&self) -> Vec<Run> {
        let starts: Vec<usize> = self
            .template
            .values()
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_empty())
            .map(|(row, _)| row)
            .collect();
        let height = self.height();

        starts
            .iter()
            .enumerate()
            .map(|(index, &start)| {
                let end = starts.get(index + 1).copied().unwrap_or(height);
                Run {
                    start,
                    rows: end - start,
                }
            })
            .collect()
    }

    /// Writes the header row and every column into `store`.
    pub fn write_to(&self, store: &mut impl TableStore) {
        for (index, column) in self.columns().enumerate() {
            store.set_cell(index, 0, &column.id);
            for (row, value) in column.values().iter().enumerate() {
                store.set_cell(index, row + 1, value);
            }
        }
    }

    /// Reads a sheet from `store`. Columns after `Arguments` are read while
    /// `is_locale` accepts their header.
    pub fn read_from(store: &impl TableStore, is_locale: impl Fn(&str) -> bool) -> Result<Self> {
        let header = move |column: usize| store.get_cell(column, 0).unwrap_or("").trim();
        if header(0) != TEMPLATE_COLUMN || header(1) != ARGUMENTS_COLUMN {
            return Err(ToolError::InvalidWorkbook(format!(
                "expected `{TEMPLATE_COLUMN}` and `{ARGUMENTS_COLUMN}` headers, found `{}` and `{}`",
                header(0),
                header(1)
            )));
        }

        let read_column = |column: usize| {
            let mut values = Column::new(header(column));
            for row in 1..store.height() {
                values.push(store.get_cell(column, row).unwrap_or(""));
            }
            values
        };

        let locales = (2..store.width())
            .take_while(|&column| is_locale(header(column)))
            .map(&read_column)
            .collect();

        Ok(Self {
            template: read_column(0),
            arguments: read_column(1),
            locales,
        })
    }
}

/// Non-fatal findings collected while building a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// More than one translatable line follows a marker; the first was used.
    MultipleCandidates {
        document: String,
        line: usize,
        candidates: usize,
    },
    /// A translated document declares no `<tag>`; its locale was left out.
    MissingLocaleTag { document: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MultipleCandidates {
                document,
                line,
                candidates,
            } => write!(
                f,
                "{candidates} translated candidates in {document} for source line {line}; using the first"
            ),
            Warning::MissingLocaleTag { document } => write!(
                f,
                "{}; skipping this translation",
                ToolError::LocaleTag(document.clone())
            ),
        }
    }
}

/// A source line that produced a run, with its argument count.
struct SourceRun<'d> {
    line: &'d Line,
    arguments: usize,
}

/// Builds sheets from a source document and its translations.
pub struct SheetBuilder<'a> {
    analyzer: &'a dyn LineAnalyzer,
    tags: &'a mut LocaleTagCache,
    warnings: Vec<Warning>,
}

impl<'a> SheetBuilder<'a> {
    pub fn new(analyzer: &'a dyn LineAnalyzer, tags: &'a mut LocaleTagCache) -> Self {
        Self {
            analyzer,
            tags,
            warnings: Vec::new(),
        }
    }

    /// Warnings raised by every build so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Builds the sheet for `source`, adding one locale column per
    /// translated document.
    pub fn build(&mut self, source: &Document, translations: &[Document]) -> Result<Sheet> {
        let mut template = Column::new(TEMPLATE_COLUMN);
        let mut arguments = Column::new(ARGUMENTS_COLUMN);
        let mut runs = Vec::new();
        let mut pending = String::new();

        for line in &source.lines {
            let composite = self.analyzer.compose(line)?;
            if !composite.is_localizable() {
                pending.push_str(&composite.template);
                pending.push_str(&line.terminator);
                continue;
            }

            let mut cell = std::mem::take(&mut pending);
            cell.push_str(&composite.template);
            cell.push_str(&line.terminator);
            template.push(cell);
            for _ in 1..composite.arguments.len() {
                template.push("");
            }

            runs.push(SourceRun {
                line,
                arguments: composite.arguments.len(),
            });
            for argument in composite.arguments {
                arguments.push(argument);
            }
        }

        if !pending.is_empty() {
            template.push(pending);
        }

        let mut locales: Vec<Column> = Vec::with_capacity(translations.len());
        for translated in translations {
            let tag = match self.tags.tag_for(translated) {
                Ok(tag) => tag,
                Err(ToolError::LocaleTag(document)) => {
                    let warning = Warning::MissingLocaleTag { document };
                    warn!("{warning}");
                    self.warnings.push(warning);
                    continue;
                }
                Err(error) => return Err(error),
            };
            let column = self.align_locale(source, translated, tag, &runs)?;
            if locales.iter().any(|existing| existing.id == column.id) {
                return Err(ToolError::InvalidWorkbook(format!(
                    "locale `{}` of {} is already provided for {}",
                    column.id, translated.id, source.id
                )));
            }
            locales.push(column);
        }

        debug!(
            document = %source.id,
            runs = runs.len(),
            rows = template.len(),
            locales = locales.len(),
            "sheet built"
        );

        Ok(Sheet {
            template,
            arguments,
            locales,
        })
    }

    fn align_locale(
        &mut self,
        source: &Document,
        translated: &Document,
        tag: String,
        runs: &[SourceRun<'_>],
    ) -> Result<Column> {
        let mut column = Column::new(tag);

        for run in runs {
            let counterpart =
                find_counterpart(run.line, translated).ok_or_else(|| ToolError::MissingLocalization {
                    document: translated.id.clone(),
                    line: run.line.number,
                    text: run.line.text.clone(),
                })?;

            if counterpart.candidates > 1 {
                let warning = Warning::MultipleCandidates {
                    document: translated.id.clone(),
                    line: run.line.number,
                    candidates: counterpart.candidates,
                };
                warn!("{warning}");
                self.warnings.push(warning);
            }

            let Some(line) = counterpart.line else {
                for _ in 0..run.arguments {
                    column.push("");
                }
                continue;
            };

            let composite = self.analyzer.compose(line)?;
            if composite.arguments.len() != run.arguments {
                return Err(ToolError::Alignment {
                    document: source.id.clone(),
                    translation: translated.id.clone(),
                    line: run.line.number,
                    expected: run.arguments,
                    found: composite.arguments.len(),
                });
            }
            for argument in composite.arguments {
                column.push(argument);
            }
        }

        Ok(column)
    }
}

/// Reconstructed source text plus one document per locale column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    pub source: String,
    pub locales: BTreeMap<String, String>,
}

/// Rebuilds the documents a sheet was built from.
///
/// Script locales are written as marker blocks (`# <hash>`, `; <source>`,
/// translated line); a run whose locale cells are all blank keeps only the
/// marker and the source comment. Record locales reuse the full template.
pub fn reverse(sheet: &Sheet, format: &DocumentFormat) -> Result<Reconstruction> {
    let runs = sheet.runs();
    let mut source = String::new();
    let mut locales: Vec<String> = sheet
        .locales
        .iter()
        .map(|column| format!("{COMMENT_LITERAL} <{}>\n", column.id))
        .collect();
    let mut hasher = LineHasher::default();

    for (index, run) in runs.iter().enumerate() {
        let template = sheet.template.get(run.start);
        let needed = placeholders(template).len();
        let rows = if index + 1 == runs.len() {
            run.rows.max(needed)
        } else {
            run.rows
        };
        let slice = |column: &Column| -> Vec<String> {
            (run.start..run.start + rows)
                .map(|row| column.get(row).to_string())
                .collect()
        };

        let value = Composite::from_template_and_args(template, slice(&sheet.arguments))?.value;
        let mut run_hash = String::new();
        let mut source_line = "";
        if format.is_script() {
            for (text, _) in split_lines(&value) {
                run_hash = hasher.hash(text);
                source_line = text;
            }
        }

        for (column, output) in sheet.locales.iter().zip(locales.iter_mut()) {
            let arguments = slice(column);
            if !format.is_script() {
                output.push_str(&Composite::from_template_and_args(template, arguments)?.value);
                continue;
            }
            if needed == 0 {
                continue;
            }

            output.push_str(&format!("{LABEL_LITERAL} {run_hash}\n{COMMENT_LITERAL} {source_line}\n"));
            if arguments.iter().all(|argument| argument.trim().is_empty()) {
                continue;
            }
            let line_template = split_lines(template).last().map_or("", |(text, _)| *text);
            output.push_str(&Composite::from_template_and_args(line_template, arguments)?.value);
            output.push('\n');
        }

        source.push_str(&value);
    }

    Ok(Reconstruction {
        source,
        locales: sheet
            .locales
            .iter()
            .map(|column| column.id.clone())
            .zip(locales)
            .collect(),
    })
}
