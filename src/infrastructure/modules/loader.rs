//! Module loader - Discovers modules on disk and binds their event handlers

use std::path::{Path, PathBuf};
use crate::application::errors::ModuleError;
use crate::application::messaging::HandlerTable;
use crate::domain::entities::EventKind;
use super::catalog::ModuleCatalog;
use super::settings::HandlerSettings;

/// A module directory and the event files found in it
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredModule {
    pub name: String,
    pub events: Vec<(EventKind, PathBuf)>,
}

/// Module loader
pub struct ModuleLoader {
    modules_dir: PathBuf,
}

impl ModuleLoader {
    pub fn new(modules_dir: impl Into<PathBuf>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
        }
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Scan the modules directory.
    ///
    /// Every subdirectory is a module, except those whose name starts with `_`
    /// or `.`. Modules come back sorted by name, and each module's events in
    /// fixed event order.
    pub fn discover(&self) -> Result<Vec<DiscoveredModule>, ModuleError> {
        let mut modules = Vec::new();

        if !self.modules_dir.exists() {
            tracing::warn!("Modules directory does not exist: {}", self.modules_dir.display());
            return Ok(modules);
        }

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.modules_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                tracing::warn!("Skipping module with non UTF-8 name: {}", path.display());
                continue;
            };
            if name.starts_with('_') || name.starts_with('.') {
                continue;
            }
            dirs.push((name, path));
        }
        dirs.sort();

        for (name, path) in dirs {
            match Self::scan_module(&path) {
                Ok(events) => modules.push(DiscoveredModule { name, events }),
                Err(e) => tracing::warn!("Failed to scan module {}: {}", name, e),
            }
        }

        Ok(modules)
    }

    /// Find the event files in one module directory
    fn scan_module(path: &Path) -> Result<Vec<(EventKind, PathBuf)>, ModuleError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut events = Vec::new();
        for kind in EventKind::ALL {
            let found = files
                .iter()
                .find(|f| f.file_stem().and_then(|s| s.to_str()) == Some(kind.as_str()));
            if let Some(file) = found {
                events.push((kind, file.clone()));
            }
        }
        Ok(events)
    }

    /// Discover modules and bind each event file to the catalog's implementation
    pub fn load(&self, catalog: &ModuleCatalog) -> Result<HandlerTable, ModuleError> {
        let mut table = HandlerTable::new();

        for module in self.discover()? {
            let Some(factory) = catalog.get(&module.name) else {
                if !module.events.is_empty() {
                    tracing::warn!("No module named '{}' is compiled in, skipping", module.name);
                }
                continue;
            };

            for (kind, file) in &module.events {
                let settings = match HandlerSettings::from_file(file) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!("Skipping {}.{}: {}", module.name, kind, e);
                        continue;
                    }
                };

                match factory(*kind, &settings) {
                    Some(handler) => {
                        tracing::info!("Found event handler {}.{}", module.name, kind);
                        table.push(*kind, module.name.clone(), handler);
                    }
                    None => {
                        tracing::warn!("Module '{}' does not handle {}, skipping", module.name, kind);
                    }
                }
            }
        }

        Ok(table)
    }
}
