//! Project configuration: an optional JSON file merged with command-line
//! values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ToolError};

pub const DEFAULT_SCRIPT_EXTENSION: &str = "nani";
pub const DEFAULT_TEXT_EXTENSION: &str = "txt";
pub const DEFAULT_RECORD_SEPARATOR: &str = "=";

/// Raw configuration as read from a file or the command line. Every field
/// is optional; unset fields fall back to defaults in [`FileConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub spreadsheet: Option<PathBuf>,
    pub scripts: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub localization: Option<PathBuf>,
    pub script_extension: Option<String>,
    pub text_extension: Option<String>,
    pub record_separator: Option<String>,
    pub keep_going: Option<bool>,
    pub single_spreadsheet: Option<bool>,
}

impl FileConfig {
    /// Loads a configuration file. Relative folders are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let mut config: FileConfig = serde_json::from_str(&data)?;

        if let Some(base) = path.parent() {
            for folder in [
                &mut config.spreadsheet,
                &mut config.scripts,
                &mut config.text,
                &mut config.localization,
            ] {
                if let Some(relative) = folder.as_mut().filter(|folder| folder.is_relative()) {
                    *relative = base.join(&*relative);
                }
            }
        }
        Ok(config)
    }

    /// Fills every unset field of `self` from `fallback`.
    pub fn merge(self, fallback: FileConfig) -> FileConfig {
        FileConfig {
            spreadsheet: self.spreadsheet.or(fallback.spreadsheet),
            scripts: self.scripts.or(fallback.scripts),
            text: self.text.or(fallback.text),
            localization: self.localization.or(fallback.localization),
            script_extension: self.script_extension.or(fallback.script_extension),
            text_extension: self.text_extension.or(fallback.text_extension),
            record_separator: self.record_separator.or(fallback.record_separator),
            keep_going: self.keep_going.or(fallback.keep_going),
            single_spreadsheet: self.single_spreadsheet.or(fallback.single_spreadsheet),
        }
    }

    /// Applies defaults and checks that the required folders are set.
    pub fn resolve(self) -> Result<ProjectConfig> {
        let spreadsheet = self
            .spreadsheet
            .ok_or_else(|| ToolError::Config("no spreadsheet path given".into()))?;
        let localization = self
            .localization
            .ok_or_else(|| ToolError::Config("no localization folder given".into()))?;
        if self.scripts.is_none() && self.text.is_none() {
            return Err(ToolError::Config(
                "neither a scripts nor a text folder is given".into(),
            ));
        }

        let record_separator = self
            .record_separator
            .unwrap_or_else(|| DEFAULT_RECORD_SEPARATOR.to_string());
        if record_separator.is_empty() {
            return Err(ToolError::Config("record separator must not be empty".into()));
        }

        Ok(ProjectConfig {
            spreadsheet,
            scripts: self.scripts,
            text: self.text,
            localization,
            script_extension: normalize_extension(self.script_extension, DEFAULT_SCRIPT_EXTENSION),
            text_extension: normalize_extension(self.text_extension, DEFAULT_TEXT_EXTENSION),
            record_separator,
            keep_going: self.keep_going.unwrap_or(false),
            single_spreadsheet: self.single_spreadsheet.unwrap_or(true),
        })
    }
}

/// Fully resolved project layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub spreadsheet: PathBuf,
    pub scripts: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub localization: PathBuf,
    /// Extension without the leading dot.
    pub script_extension: String,
    pub text_extension: String,
    pub record_separator: String,
    /// Skip failing documents instead of aborting the run.
    pub keep_going: bool,
    /// When `false`, `spreadsheet` is a folder holding one workbook per
    /// document at `Scripts|Text/<dir>/<name>.xlsx`.
    pub single_spreadsheet: bool,
}

fn normalize_extension(extension: Option<String>, default: &str) -> String {
    extension
        .as_deref()
        .map(|extension| extension.trim_start_matches('.'))
        .filter(|extension| !extension.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_values_override_file_values() {
        let cli = FileConfig {
            spreadsheet: Some(PathBuf::from("cli.xlsx")),
            ..FileConfig::default()
        };
        let file = FileConfig {
            spreadsheet: Some(PathBuf::from("file.xlsx")),
            scripts: Some(PathBuf::from("scripts")),
            localization: Some(PathBuf::from("l10n")),
            keep_going: Some(true),
            ..FileConfig::default()
        };

        let config = cli.merge(file).resolve().unwrap();
        assert_eq!(config.spreadsheet, PathBuf::from("cli.xlsx"));
        assert_eq!(config.scripts, Some(PathBuf::from("scripts")));
        assert!(config.keep_going);
        assert_eq!(config.script_extension, "nani");
        assert_eq!(config.record_separator, "=");
        assert!(config.single_spreadsheet);
    }

    #[test]
    fn extensions_lose_leading_dot() {
        assert_eq!(normalize_extension(Some(".md".into()), "txt"), "md");
        assert_eq!(normalize_extension(Some(".".into()), "txt"), "txt");
    }

    #[test]
    fn missing_folders_are_config_errors() {
        let config = FileConfig {
            spreadsheet: Some(PathBuf::from("a.xlsx")),
            localization: Some(PathBuf::from("l10n")),
            ..FileConfig::default()
        };
        assert!(matches!(config.resolve(), Err(ToolError::Config(_))));
    }

    #[test]
    fn file_folders_resolve_against_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locsheet.json");
        std::fs::write(
            &path,
            r#"{"spreadsheet": "out", "scripts": "Scripts", "record_separator": ":", "single_spreadsheet": false}"#,
        )
        .unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.spreadsheet, Some(dir.path().join("out")));
        assert_eq!(config.record_separator.as_deref(), Some(":"));
        assert_eq!(config.single_spreadsheet, Some(false));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locsheet.json");
        std::fs::write(&path, r#"{"spreadsheets": "x"}"#).unwrap();
        assert!(matches!(FileConfig::load(&path), Err(ToolError::Json(_))));
    }
}
