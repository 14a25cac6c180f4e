//! Handler settings read from a module's event file

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::path::Path;
use crate::application::errors::ModuleError;

/// Settings for one module handler.
///
/// Event files ending in `.yaml`/`.yml` are parsed as YAML; any other file only
/// marks the subscription and yields empty settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerSettings {
    value: Value,
}

impl HandlerSettings {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if !is_yaml {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|message| ModuleError::Settings {
            path: path.display().to_string(),
            message,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map(Self::new)
            .map_err(|e| e.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.value.get(key).and_then(Value::as_bool)
    }

    /// Deserialize the whole settings document into a typed struct
    pub fn parse<T: DeserializeOwned + Default>(&self) -> Result<T, String> {
        if self.is_empty() {
            return Ok(T::default());
        }
        serde_yaml::from_value(self.value.clone()).map_err(|e| e.to_string())
    }
}
