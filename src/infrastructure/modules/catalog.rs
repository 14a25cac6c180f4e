//! Module catalog - Compiled-in module implementations, looked up by name

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::application::messaging::EventHandler;
use crate::domain::entities::EventKind;
use super::settings::HandlerSettings;

/// Builds a module's handler for one event, or `None` if the module does not handle it
pub type ModuleFactory =
    Arc<dyn Fn(EventKind, &HandlerSettings) -> Option<Arc<dyn EventHandler>> + Send + Sync>;

/// Registry of module implementations
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: BTreeMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every module bundled with the bot
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        crate::modules::register_builtin(&mut catalog);
        catalog
    }

    /// Register a module implementation
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(EventKind, &HandlerSettings) -> Option<Arc<dyn EventHandler>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::warn!("Module '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<ModuleFactory> {
        self.factories.get(name).cloned()
    }

    /// Registered module names, sorted
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}
