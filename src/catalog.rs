//! Declarative metadata describing which commands and parameters carry
//! human-translatable text.
//!
//! The extractor consults a [`Catalog`] to decide which parameters are
//! localizable. Catalogs are plain JSON documents:
//!
//! ```json
//! {
//!   "commands": {
//!     "say": { "translatable": true, "parameters": { "text": true, "who": false } }
//!   }
//! }
//! ```
//!
//! The empty parameter identifier (`""`) stands for the nameless parameter.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// Identifier used for the parameter written without a `name=` prefix.
pub const NAMELESS_PARAMETER: &str = "";

/// Lookup table mapping command and parameter identifiers to a translatable
/// flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,
}

/// Catalog entry for one command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Whether any parameter of the command may carry translatable text.
    #[serde(default)]
    pub translatable: bool,
    /// Parameter identifier → translatable flag.
    #[serde(default)]
    pub parameters: BTreeMap<String, bool>,
}

impl Catalog {
    /// Loads a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parses a catalog from JSON text.
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Catalog covering the commands most scenario scripts rely on.
    pub fn builtin() -> Self {
        let mut catalog = Catalog::default();
        catalog.insert("print", true, &[("", true), ("author", false), ("wait", false)]);
        catalog.insert("say", true, &[("text", true), ("who", false)]);
        catalog.insert("choice", true, &[("", true), ("goto", false), ("set", false)]);
        catalog.insert("title", true, &[("", true)]);
        catalog.insert("wait", false, &[("", false)]);
        catalog.insert("i", false, &[]);
        catalog.insert("br", false, &[("", false)]);
        catalog.insert("goto", false, &[("", false)]);
        catalog.insert("char", false, &[("", false), ("pose", false), ("pos", false)]);
        catalog.insert("back", false, &[("", false), ("time", false)]);
        catalog.insert("bgm", false, &[("", false), ("volume", false)]);
        catalog.insert("set", false, &[("", false)]);
        catalog.insert("stop", false, &[]);
        catalog
    }

    /// Registers a command with its parameter flags, replacing any previous
    /// entry.
    pub fn insert(&mut self, command: &str, translatable: bool, parameters: &[(&str, bool)]) {
        let parameters = parameters
            .iter()
            .map(|(id, flag)| ((*id).to_string(), *flag))
            .collect();
        self.commands.insert(
            command.to_string(),
            CommandSpec {
                translatable,
                parameters,
            },
        );
    }

    /// Returns whether the command can carry translatable parameters.
    pub fn is_command_translatable(&self, command: &str) -> Result<bool> {
        self.command(command).map(|spec| spec.translatable)
    }

    /// Returns whether the given parameter of the command is translatable.
    pub fn is_parameter_translatable(&self, command: &str, parameter: &str) -> Result<bool> {
        let spec = self.command(command)?;
        let flag = spec
            .parameters
            .get(parameter)
            .ok_or_else(|| ToolError::unknown_parameter(command, parameter))?;
        Ok(spec.translatable && *flag)
    }

    fn command(&self, command: &str) -> Result<&CommandSpec> {
        self.commands
            .get(command)
            .ok_or_else(|| ToolError::unknown_command(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_lookup_respects_command_flag() {
        let mut catalog = Catalog::default();
        catalog.insert("note", false, &[("text", true)]);
        catalog.insert("say", true, &[("text", true), ("who", false)]);

        assert!(!catalog.is_parameter_translatable("note", "text").unwrap());
        assert!(catalog.is_parameter_translatable("say", "text").unwrap());
        assert!(!catalog.is_parameter_translatable("say", "who").unwrap());
    }

    #[test]
    fn unknown_entries_are_schema_errors() {
        let catalog = Catalog::builtin();

        let err = catalog.is_command_translatable("explode").unwrap_err();
        assert!(matches!(err, ToolError::Schema { parameter: None, .. }));

        let err = catalog.is_parameter_translatable("say", "volume").unwrap_err();
        assert!(matches!(
            err,
            ToolError::Schema { parameter: Some(ref p), .. } if p == "volume"
        ));
    }

    #[test]
    fn catalog_parses_from_json() {
        let catalog = Catalog::from_json(
            r#"{"commands": {"say": {"translatable": true, "parameters": {"text": true, "": false}}}}"#,
        )
        .unwrap();

        assert!(catalog.is_parameter_translatable("say", "text").unwrap());
        assert!(!catalog
            .is_parameter_translatable("say", NAMELESS_PARAMETER)
            .unwrap());
    }
}
