use crate::error::{LitematicError, Result};
use crate::schematic::Litematic;
use std::sync::{Arc, Mutex, OnceLock};

pub trait SchematicImporter: Send + Sync {
    fn name(&self) -> String;
    fn detect(&self, data: &[u8]) -> bool;
    fn read(&self, data: &[u8]) -> Result<Litematic>;
}

pub trait SchematicExporter: Send + Sync {
    fn name(&self) -> String;
    fn extensions(&self) -> Vec<String>;
    fn write(&self, litematic: &Litematic, settings: Option<&str>) -> Result<Vec<u8>>;
    fn export_settings_schema(&self) -> Option<String> {
        None
    }
}

#[derive(Default)]
pub struct FormatManager {
    importers: Vec<Box<dyn SchematicImporter>>,
    exporters: Vec<Box<dyn SchematicExporter>>,
}

impl FormatManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with every built-in format registered.
    pub fn with_defaults() -> Self {
        let mut manager = FormatManager::new();
        manager.register_importer(crate::formats::litematic::LitematicFormat);
        manager.register_exporter(crate::formats::litematic::LitematicFormat);
        manager.register_importer(crate::formats::structure::StructureFormat);
        manager.register_exporter(crate::formats::structure::StructureFormat);
        // Text detection last, binary formats are checked first
        manager.register_importer(crate::formats::commands::CommandsFormat);
        manager.register_exporter(crate::formats::commands::CommandsFormat);
        manager
    }

    pub fn register_importer<I: SchematicImporter + 'static>(&mut self, importer: I) {
        self.importers.push(Box::new(importer));
    }

    pub fn register_exporter<E: SchematicExporter + 'static>(&mut self, exporter: E) {
        self.exporters.push(Box::new(exporter));
    }

    pub fn detect_format(&self, data: &[u8]) -> Option<String> {
        self.importers
            .iter()
            .find(|importer| importer.detect(data))
            .map(|importer| importer.name())
    }

    pub fn read(&self, data: &[u8]) -> Result<Litematic> {
        for importer in &self.importers {
            if importer.detect(data) {
                return importer.read(data);
            }
        }
        Err(LitematicError::UnsupportedFormat(
            "unknown or unsupported schematic format".to_string(),
        ))
    }

    pub fn write(
        &self,
        format: &str,
        litematic: &Litematic,
        settings: Option<&str>,
    ) -> Result<Vec<u8>> {
        self.exporter(format)?.write(litematic, settings)
    }

    /// Pick the exporter from the file extension of `path`.
    pub fn write_auto(
        &self,
        path: &str,
        litematic: &Litematic,
        settings: Option<&str>,
    ) -> Result<Vec<u8>> {
        let extension = std::path::Path::new(path)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        for exporter in &self.exporters {
            if exporter.extensions().contains(&extension) {
                return exporter.write(litematic, settings);
            }
        }
        Err(LitematicError::UnsupportedFormat(format!(
            "could not determine format from extension: .{}",
            extension
        )))
    }

    pub fn list_importers(&self) -> Vec<String> {
        self.importers.iter().map(|i| i.name()).collect()
    }

    pub fn list_exporters(&self) -> Vec<String> {
        self.exporters.iter().map(|e| e.name()).collect()
    }

    pub fn get_export_settings_schema(&self, format: &str) -> Option<String> {
        self.exporter(format).ok()?.export_settings_schema()
    }

    fn exporter(&self, format: &str) -> Result<&dyn SchematicExporter> {
        self.exporters
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(format))
            .map(|e| e.as_ref())
            .ok_or_else(|| LitematicError::UnsupportedFormat(format.to_string()))
    }
}

pub static MANAGER: OnceLock<Arc<Mutex<FormatManager>>> = OnceLock::new();

pub fn get_manager() -> Arc<Mutex<FormatManager>> {
    MANAGER
        .get_or_init(|| Arc::new(Mutex::new(FormatManager::with_defaults())))
        .clone()
}
