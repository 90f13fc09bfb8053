//! `.mcfunction` export of the greedy `/fill` command list, plus import of
//! command text back into a schematic.

use crate::command_parser::parse_commands;
use crate::commands::{to_script, CommandOptions};
use crate::error::{LitematicError, Result};
use crate::formats::manager::{SchematicExporter, SchematicImporter};
use crate::schematic::Litematic;

pub struct CommandsFormat;

impl SchematicImporter for CommandsFormat {
    fn name(&self) -> String {
        "commands".to_string()
    }

    fn detect(&self, data: &[u8]) -> bool {
        match std::str::from_utf8(data) {
            Ok(text) => {
                let text = text.trim_start();
                text.starts_with("/setblock") || text.starts_with("/fill")
            }
            Err(_) => false,
        }
    }

    fn read(&self, data: &[u8]) -> Result<Litematic> {
        let text = std::str::from_utf8(data)
            .map_err(|e| LitematicError::UnsupportedFormat(format!("commands are not UTF-8: {}", e)))?;
        parse_commands(text)
    }
}

impl SchematicExporter for CommandsFormat {
    fn name(&self) -> String {
        "commands".to_string()
    }

    fn extensions(&self) -> Vec<String> {
        vec!["mcfunction".to_string(), "txt".to_string()]
    }

    /// Settings: `{"origin": [x, y, z]}`.
    fn write(&self, litematic: &Litematic, settings: Option<&str>) -> Result<Vec<u8>> {
        let options = CommandOptions::from_settings(settings)?;
        let mut script = to_script(&litematic.fill_commands(&options));
        script.push('\n');
        Ok(script.into_bytes())
    }

    fn export_settings_schema(&self) -> Option<String> {
        Some(r#"{"origin":{"type":"array","items":"integer","default":[0,0,0]}}"#.to_string())
    }
}
