//! File-based storage implementation

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::traits::Store;
use crate::application::errors::StorageError;

/// Data file contents: section name -> JSON object.
///
/// Sections may hold any JSON. The store reads and writes string leaves and
/// leaves everything else as it found it.
pub type Document = Map<String, Value>;

fn read_leaf(doc: &Document, section: &str, key: &str) -> Option<String> {
    match doc.get(section)?.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        other => Some(other.to_string()),
    }
}

fn write_leaf(doc: &mut Document, section: &str, key: &str, value: &str) {
    let entry = doc
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        tracing::warn!("Section '{}' is not an object, replacing it", section);
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(fields) = entry {
        fields.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// JSON data file store
pub struct JsonStore {
    path: PathBuf,
    data: Arc<RwLock<Document>>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: Arc::new(RwLock::new(Document::new())),
        }
    }

    /// Open a data file, starting empty when it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self::new(path);
        store.reload().await?;
        Ok(store)
    }

    /// Re-read the data file from disk
    pub async fn reload(&self) -> Result<(), StorageError> {
        let document = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Document::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(e) => return Err(e.into()),
        };
        *self.data.write().await = document;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn get(&self, section: &str, key: &str) -> Result<Option<String>, StorageError> {
        let data = self.data.read().await;
        Ok(read_leaf(&data, section, key))
    }

    async fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        write_leaf(&mut data, section, key, value);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = {
            let data = self.data.read().await;
            serde_json::to_string_pretty(&*data)?
        };
        // Replace the data file atomically
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_store_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        let store = JsonStore::open(&path).await.unwrap();
        store.set("discord", "client_id", "1234").await.unwrap();
        store.flush().await.unwrap();

        let reopened = JsonStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("discord", "client_id").await.unwrap(), Some("1234".to_string()));
        assert_eq!(reopened.get("discord", "token").await.unwrap(), None);
        assert_eq!(reopened.get("other", "client_id").await.unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_store_keeps_unrelated_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"music": {"volume": "20"}}"#).unwrap();

        let store = JsonStore::open(&path).await.unwrap();
        store.set("discord", "token", "t").await.unwrap();
        store.flush().await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["music"]["volume"], "20");
        assert_eq!(raw["discord"]["token"], "t");
    }

    #[tokio::test]
    async fn test_json_store_keeps_nested_and_numeric_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let seeded = json!({
            "discord": {"token": "old", "servers": {"10": {"prefix": "!"}}},
            "music": {"volume": 20, "queue": ["a", "b"]},
        });
        std::fs::write(&path, seeded.to_string()).unwrap();

        let store = JsonStore::open(&path).await.unwrap();
        assert_eq!(store.get("music", "volume").await.unwrap(), Some("20".to_string()));
        assert_eq!(store.get("music", "queue").await.unwrap(), None);
        assert_eq!(store.get("discord", "servers").await.unwrap(), None);

        store.set("discord", "token", "new").await.unwrap();
        store.flush().await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["discord"]["token"], "new");
        assert_eq!(raw["discord"]["servers"]["10"]["prefix"], "!");
        assert_eq!(raw["music"]["volume"], 20);
        assert_eq!(raw["music"]["queue"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_set_replaces_scalar_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"discord": "legacy"}"#).unwrap();

        let store = JsonStore::open(&path).await.unwrap();
        assert_eq!(store.get("discord", "token").await.unwrap(), None);
        store.set("discord", "token", "t").await.unwrap();
        assert_eq!(store.get("discord", "token").await.unwrap(), Some("t".to_string()));
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(JsonStore::open(&path).await, Err(StorageError::Serialization(_))));
    }
}
