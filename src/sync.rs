use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::align::{LocaleTagCache, is_locale_tag};
use crate::catalog::Catalog;
use crate::config::ProjectConfig;
use crate::document::{Document, DocumentFormat};
use crate::error::{Result, ToolError};
use crate::io::{excel_read, excel_write};
use crate::script::analyzer_for;
use crate::sheet::{Sheet, SheetBuilder, reverse};
use crate::workbook::{SCRIPTS_PREFIX, SheetEntry, TEXT_PREFIX, WorkbookBuilder, WorkbookData};

const WORKBOOK_EXTENSION: &str = "xlsx";

/// Counts reported by [`export_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub documents: usize,
    /// Translated documents merged into locale columns.
    pub translations: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub workbooks: usize,
}

/// Counts reported by [`import_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub documents: usize,
    pub locale_documents: usize,
    pub skipped: usize,
}

/// A document found under one of the project's source folders.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceFile {
    path: PathBuf,
    /// Path relative to the source folder, `/` separated.
    relative: String,
    format: DocumentFormat,
}

/// Builds one sheet per project document and writes them to the
/// configured spreadsheet, or to one workbook per document when
/// `single_spreadsheet` is off.
#[instrument(
    level = "info",
    skip_all,
    fields(output = %config.spreadsheet.display(), localization = %config.localization.display())
)]
pub fn export_project(config: &ProjectConfig, catalog: &Catalog) -> Result<ExportSummary> {
    let sources = discover_sources(config)?;
    let locale_dirs = discover_locale_dirs(&config.localization)?;
    info!(
        document_count = sources.len(),
        locale_count = locale_dirs.len(),
        "discovered project documents"
    );

    let mut summary = ExportSummary::default();
    let mut tags = LocaleTagCache::new();
    let mut exported = Vec::new();

    for source in &sources {
        match export_document(source, &locale_dirs, catalog, &mut tags) {
            Ok(export) => {
                debug!(
                    document = %source.relative,
                    locales = export.sheet.locales.len(),
                    "document exported"
                );
                summary.documents += 1;
                summary.translations += export.sheet.locales.len();
                summary.warnings += export.warnings;
                exported.push((source, export.sheet));
            }
            Err(error) if config.keep_going => {
                warn!(document = %source.relative, %error, "skipping document");
                summary.skipped += 1;
            }
            Err(error) => return Err(error),
        }
    }

    if config.single_spreadsheet {
        let mut workbook = WorkbookBuilder::new();
        for (source, sheet) in &exported {
            workbook.add(sheet, &source.format, &source.relative);
        }
        write_workbook_file(&config.spreadsheet, workbook)?;
        summary.workbooks = 1;
    } else {
        for (source, sheet) in &exported {
            let mut workbook = WorkbookBuilder::new();
            workbook.add(sheet, &source.format, &source.relative);
            write_workbook_file(&document_workbook_path(&config.spreadsheet, source), workbook)?;
            summary.workbooks += 1;
        }
    }

    info!(
        documents = summary.documents,
        translations = summary.translations,
        skipped = summary.skipped,
        workbooks = summary.workbooks,
        "export finished"
    );
    Ok(summary)
}

/// Reads the configured spreadsheet (or every workbook under the spreadsheet
/// folder when `single_spreadsheet` is off) and writes every sheet back as a
/// source document plus one document per locale column.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %config.spreadsheet.display(), localization = %config.localization.display())
)]
pub fn import_project(config: &ProjectConfig) -> Result<ImportSummary> {
    let paths = if config.single_spreadsheet {
        vec![config.spreadsheet.clone()]
    } else {
        discover_workbooks(&config.spreadsheet)?
    };
    info!(workbook_count = paths.len(), "discovered workbooks");

    let mut summary = ImportSummary::default();
    for path in &paths {
        match import_workbook(config, path, &mut summary) {
            Ok(()) => {}
            Err(error) if config.keep_going => {
                warn!(workbook = %path.display(), %error, "skipping workbook");
                summary.skipped += 1;
            }
            Err(error) => return Err(error),
        }
    }

    info!(
        documents = summary.documents,
        locale_documents = summary.locale_documents,
        skipped = summary.skipped,
        "import finished"
    );
    Ok(summary)
}

fn import_workbook(config: &ProjectConfig, path: &Path, summary: &mut ImportSummary) -> Result<()> {
    let workbook = excel_read::read_workbook(path)?;
    let entries = workbook.entries()?;
    debug!(workbook = %path.display(), sheet_count = entries.len(), "read workbook metadata");

    for entry in &entries {
        match import_sheet(config, &workbook, entry) {
            Ok(locales) => {
                summary.documents += 1;
                summary.locale_documents += locales;
            }
            Err(error) if config.keep_going => {
                warn!(sheet = %entry.sheet, %error, "skipping sheet");
                summary.skipped += 1;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

fn write_workbook_file(path: &Path, workbook: WorkbookBuilder) -> Result<()> {
    if workbook.is_empty() {
        warn!(path = %path.display(), "no documents exported, writing metadata only");
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let sheets = workbook.len();
    excel_write::write_workbook(path, &workbook.finish())?;
    debug!(path = %path.display(), sheets, "workbook written");
    Ok(())
}

/// `<folder>/Scripts|Text/<dir>/<name>.xlsx` for one document.
fn document_workbook_path(folder: &Path, source: &SourceFile) -> PathBuf {
    folder
        .join(folder_prefix(&source.format))
        .join(Path::new(&source.relative).with_extension(WORKBOOK_EXTENSION))
}

/// Lists every `.xlsx` under `folder`, sorted by path.
fn discover_workbooks(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ToolError::MissingInput(folder.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(folder).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let is_workbook = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(WORKBOOK_EXTENSION));
        // Lock files left behind by spreadsheet editors.
        let is_lock = entry.file_name().to_string_lossy().starts_with("~$");
        if entry.file_type().is_file() && is_workbook && !is_lock {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

struct DocumentExport {
    sheet: Sheet,
    warnings: usize,
}

fn export_document(
    source: &SourceFile,
    locale_dirs: &[PathBuf],
    catalog: &Catalog,
    tags: &mut LocaleTagCache,
) -> Result<DocumentExport> {
    let text = fs::read_to_string(&source.path)?;
    let document = Document::parse(source.relative.clone(), &text, source.format.clone());
    let prefix = folder_prefix(&source.format);

    let mut translations = Vec::new();
    for locale_dir in locale_dirs {
        let path = locale_dir.join(prefix).join(&source.relative);
        if !path.is_file() {
            warn!(
                document = %source.relative,
                path = %path.display(),
                "localization not found, skipping"
            );
            continue;
        }
        let id = path.to_string_lossy().into_owned();
        translations.push(Document::parse(id, &fs::read_to_string(&path)?, source.format.clone()));
    }

    let analyzer = analyzer_for(&source.format, catalog);
    let mut builder = SheetBuilder::new(analyzer.as_ref(), tags);
    let sheet = builder.build(&document, &translations)?;
    Ok(DocumentExport {
        sheet,
        warnings: builder.warnings().len(),
    })
}

fn import_sheet(config: &ProjectConfig, workbook: &WorkbookData, entry: &SheetEntry) -> Result<usize> {
    let table = workbook
        .table(&entry.sheet)
        .ok_or_else(|| ToolError::MissingMetadata(entry.sheet.clone()))?;
    let format = entry.format(&config.record_separator)?;
    let relative = checked_relative_path(&entry.path)?;
    let root = source_root(config, &format)?;

    let sheet = Sheet::read_from(table, is_locale_tag)?;
    let reconstruction = reverse(&sheet, &format)?;

    write_document(&root.join(&relative), &reconstruction.source)?;
    for (tag, text) in &reconstruction.locales {
        let path = config
            .localization
            .join(tag)
            .join(folder_prefix(&format))
            .join(&relative);
        write_document(&path, text)?;
    }

    debug!(
        sheet = %entry.sheet,
        path = %entry.path,
        locales = reconstruction.locales.len(),
        "sheet imported"
    );
    Ok(reconstruction.locales.len())
}

fn discover_sources(config: &ProjectConfig) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    if let Some(scripts) = &config.scripts {
        collect_sources(
            scripts,
            &config.script_extension,
            &DocumentFormat::Script,
            &config.localization,
            &mut sources,
        )?;
    }
    if let Some(text) = &config.text {
        let format = DocumentFormat::Records {
            separator: config.record_separator.clone(),
        };
        collect_sources(
            text,
            &config.text_extension,
            &format,
            &config.localization,
            &mut sources,
        )?;
    }
    Ok(sources)
}

fn collect_sources(
    root: &Path,
    extension: &str,
    format: &DocumentFormat,
    localization: &Path,
    sources: &mut Vec<SourceFile>,
) -> Result<()> {
    if !root.is_dir() {
        return Err(ToolError::MissingInput(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != localization);
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let matches_extension = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
        if !entry.file_type().is_file() || !matches_extension {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|_| ToolError::MissingInput(path.to_path_buf()))?;
        sources.push(SourceFile {
            path: path.to_path_buf(),
            relative: relative_to_string(relative),
            format: format.clone(),
        });
    }
    Ok(())
}

/// Lists the locale folders under the localization root.
fn discover_locale_dirs(localization: &Path) -> Result<Vec<PathBuf>> {
    if !localization.is_dir() {
        warn!(path = %localization.display(), "localization folder not found, exporting without translations");
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(localization)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn folder_prefix(format: &DocumentFormat) -> &'static str {
    if format.is_script() {
        SCRIPTS_PREFIX
    } else {
        TEXT_PREFIX
    }
}

fn source_root<'c>(config: &'c ProjectConfig, format: &DocumentFormat) -> Result<&'c Path> {
    let root = if format.is_script() {
        config.scripts.as_deref()
    } else {
        config.text.as_deref()
    };
    root.ok_or_else(|| {
        ToolError::Config(format!(
            "workbook contains {} documents but no {} folder is configured",
            format.kind(),
            folder_prefix(format).to_lowercase()
        ))
    })
}

fn relative_to_string(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Rejects metadata paths that would escape the target folder.
fn checked_relative_path(path: &str) -> Result<PathBuf> {
    let relative = PathBuf::from(path);
    let escapes = relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)));
    if relative.as_os_str().is_empty() || escapes {
        return Err(ToolError::InvalidWorkbook(format!(
            "document path '{path}' must be relative to its folder"
        )));
    }
    Ok(relative)
}

fn write_document(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_use_forward_slashes() {
        let path = Path::new("chapter1").join("intro.nani");
        assert_eq!(relative_to_string(&path), "chapter1/intro.nani");
    }

    #[test]
    fn escaping_metadata_paths_are_rejected() {
        assert!(checked_relative_path("../outside.nani").is_err());
        assert!(checked_relative_path("/etc/passwd").is_err());
        assert!(checked_relative_path("").is_err());
        assert_eq!(
            checked_relative_path("a/b.nani").unwrap(),
            PathBuf::from("a/b.nani")
        );
    }

    #[test]
    fn sources_skip_other_extensions_and_the_localization_folder() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("Scripts");
        let localization = scripts.join("Localization");
        fs::create_dir_all(scripts.join("act1")).unwrap();
        fs::create_dir_all(localization.join("ja/Scripts")).unwrap();
        fs::write(scripts.join("act1/intro.nani"), "; hi\n").unwrap();
        fs::write(scripts.join("notes.md"), "notes").unwrap();
        fs::write(localization.join("ja/Scripts/intro.nani"), "; <ja>\n").unwrap();

        let mut sources = Vec::new();
        collect_sources(&scripts, "nani", &DocumentFormat::Script, &localization, &mut sources).unwrap();

        let relative: Vec<&str> = sources.iter().map(|source| source.relative.as_str()).collect();
        assert_eq!(relative, vec!["act1/intro.nani"]);
    }

    #[test]
    fn document_workbooks_mirror_source_folders() {
        let source = SourceFile {
            path: PathBuf::from("Text/menus/ui.txt"),
            relative: "menus/ui.txt".to_string(),
            format: DocumentFormat::Records {
                separator: "=".to_string(),
            },
        };
        assert_eq!(
            document_workbook_path(Path::new("sheets"), &source),
            Path::new("sheets").join("Text").join("menus").join("ui.xlsx")
        );
    }

    #[test]
    fn workbook_discovery_skips_lock_files_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Scripts/act1")).unwrap();
        fs::write(dir.path().join("Scripts/act1/intro.xlsx"), "").unwrap();
        fs::write(dir.path().join("Scripts/act1/~$intro.xlsx"), "").unwrap();
        fs::write(dir.path().join("Scripts/readme.txt"), "").unwrap();
        fs::write(dir.path().join("a.XLSX"), "").unwrap();

        let found = discover_workbooks(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("Scripts/act1/intro.xlsx"), dir.path().join("a.XLSX")]
        );
        assert!(matches!(
            discover_workbooks(&dir.path().join("none")),
            Err(ToolError::MissingInput(_))
        ));
    }

    #[test]
    fn missing_localization_folder_means_no_locales() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_locale_dirs(&dir.path().join("none")).unwrap().is_empty());
    }
}
