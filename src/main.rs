use std::path::PathBuf;

use clap::{Parser, Subcommand};
use locsheet::catalog::Catalog;
use locsheet::config::{FileConfig, ProjectConfig};
use locsheet::sync;
use locsheet::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    match cli.command {
        Command::Export(args) => {
            let catalog = match &args.catalog {
                Some(path) => Catalog::load(path)?,
                None => Catalog::builtin(),
            };
            let config = args.project.resolve()?;
            let summary = sync::export_project(&config, &catalog)?;
            println!(
                "exported {} document(s) with {} translation(s) to {} workbook(s) at {}",
                summary.documents,
                summary.translations,
                summary.workbooks,
                config.spreadsheet.display()
            );
        }
        Command::Import(args) => {
            let config = args.project.resolve()?;
            let summary = sync::import_project(&config)?;
            println!(
                "imported {} document(s) and {} locale document(s) from {}",
                summary.documents,
                summary.locale_documents,
                config.spreadsheet.display()
            );
        }
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Move scenario scripts and text documents in and out of translation spreadsheets."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a spreadsheet from the project's documents and translations.
    Export(ExportArgs),
    /// Write documents and translations back from a spreadsheet.
    Import(ImportArgs),
}

#[derive(clap::Args)]
struct ExportArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// JSON catalog of translatable commands and parameters.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ImportArgs {
    #[command(flatten)]
    project: ProjectArgs,
}

#[derive(clap::Args)]
struct ProjectArgs {
    /// Spreadsheet (.xlsx) to write or read, or the workbook folder when
    /// `--single-spreadsheet false` is given.
    #[arg(long)]
    spreadsheet: Option<PathBuf>,

    /// Folder holding the scenario scripts.
    #[arg(long)]
    scripts: Option<PathBuf>,

    /// Folder holding the key/value text documents.
    #[arg(long)]
    text: Option<PathBuf>,

    /// Folder holding one sub-folder per locale.
    #[arg(long)]
    localization: Option<PathBuf>,

    /// JSON project configuration; command-line values take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Script file extension.
    #[arg(long)]
    script_extension: Option<String>,

    /// Text document file extension.
    #[arg(long)]
    text_extension: Option<String>,

    /// Separator between record identifier and value.
    #[arg(long)]
    record_separator: Option<String>,

    /// Skip documents that fail instead of aborting.
    #[arg(long)]
    keep_going: bool,

    /// Use one workbook for the whole project (`true`), or treat the
    /// spreadsheet path as a folder with one workbook per document (`false`).
    #[arg(long)]
    single_spreadsheet: Option<bool>,
}

impl ProjectArgs {
    fn resolve(self) -> Result<ProjectConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let cli = FileConfig {
            spreadsheet: self.spreadsheet,
            scripts: self.scripts,
            text: self.text,
            localization: self.localization,
            script_extension: self.script_extension,
            text_extension: self.text_extension,
            record_separator: self.record_separator,
            keep_going: self.keep_going.then_some(true),
            single_spreadsheet: self.single_spreadsheet,
        };
        cli.merge(file).resolve()
    }
}
