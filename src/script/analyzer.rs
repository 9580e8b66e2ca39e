use crate::catalog::Catalog;
use crate::composite::{Composite, LocalizableSpan};
use crate::document::{DocumentFormat, Line, LineKind};
use crate::error::{Result, ToolError};
use crate::script::parser::{self, CommandToken, ParsedLine, Segment};

/// Yields the localizable spans of a line, in any order.
pub trait LineAnalyzer {
    /// Returns the byte ranges of `line.text` holding translatable text.
    fn localizable_spans(&self, line: &Line) -> Result<Vec<LocalizableSpan>>;

    /// Splits the line into its template and arguments.
    fn compose(&self, line: &Line) -> Result<Composite> {
        let spans = self.localizable_spans(line)?;
        Composite::from_line(&line.text, &spans)
    }
}

/// Picks the analyzer matching a document format.
pub fn analyzer_for<'a>(format: &DocumentFormat, catalog: &'a Catalog) -> Box<dyn LineAnalyzer + 'a> {
    match format {
        DocumentFormat::Script => Box::new(ScriptAnalyzer::new(catalog)),
        DocumentFormat::Records { separator } => Box::new(RecordAnalyzer::new(separator.clone())),
    }
}

/// Analyzer for script lines, driven by a metadata [`Catalog`].
///
/// The span of a quoted parameter value is the content between the quotes,
/// so the quotes stay in the template: `@say text="Hello" who=Alice` becomes
/// `@say text="{0}" who=Alice` with arguments `["Hello"]`. Unquoted values
/// produce `@say text={0} who=Alice`.
pub struct ScriptAnalyzer<'a> {
    catalog: &'a Catalog,
}

impl<'a> ScriptAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn collect_parameters(
        &self,
        text: &str,
        command: &CommandToken,
        spans: &mut Vec<LocalizableSpan>,
    ) -> Result<()> {
        self.catalog.is_command_translatable(&command.name)?;
        for parameter in &command.parameters {
            if self
                .catalog
                .is_parameter_translatable(&command.name, &parameter.id)?
            {
                let range = parameter.value.clone();
                spans.push(LocalizableSpan::new(range.start, &text[range]));
            }
        }
        Ok(())
    }
}

impl LineAnalyzer for ScriptAnalyzer<'_> {
    fn localizable_spans(&self, line: &Line) -> Result<Vec<LocalizableSpan>> {
        let parsed = match line.kind {
            LineKind::Command => parser::parse_command_line(&line.text),
            LineKind::GenericText => parser::parse_generic_line(&line.text),
            _ => return Ok(Vec::new()),
        }
        .map_err(|reason| ToolError::Parse {
            line: line.number,
            text: line.text.clone(),
            reason,
        })?;

        let mut spans = Vec::new();
        match parsed {
            ParsedLine::Command(command) => {
                self.collect_parameters(&line.text, &command, &mut spans)?;
            }
            ParsedLine::GenericText { segments, .. } => {
                for segment in segments {
                    match segment {
                        Segment::Text(range) => {
                            spans.push(LocalizableSpan::new(range.start, &line.text[range]));
                        }
                        Segment::Inline(command) => {
                            self.collect_parameters(&line.text, &command, &mut spans)?;
                        }
                    }
                }
            }
        }
        Ok(spans)
    }
}

/// Analyzer for `identifier<separator>value` records.
pub struct RecordAnalyzer {
    separator: String,
}

impl RecordAnalyzer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl LineAnalyzer for RecordAnalyzer {
    fn localizable_spans(&self, line: &Line) -> Result<Vec<LocalizableSpan>> {
        if line.kind != LineKind::Record {
            return Ok(Vec::new());
        }
        Ok(line
            .text
            .find(&self.separator)
            .map(|position| {
                let start = position + self.separator.len();
                vec![LocalizableSpan::new(start, &line.text[start..])]
            })
            .unwrap_or_default())
    }

    fn compose(&self, line: &Line) -> Result<Composite> {
        match line.kind {
            LineKind::Record => Ok(Composite::from_record(&line.text, &self.separator)),
            _ => Composite::from_line(&line.text, &[]),
        }
    }
}
