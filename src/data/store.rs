use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::StoreError;

/// String-keyed persistence with get-or-default reads.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove_all(&self) -> Result<(), StoreError>;

    fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    fn set_f64(&self, key: &str, value: f64) -> Result<(), StoreError> {
        self.set(key, Value::from(value))
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set(key, Value::from(value))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_all(&self) -> Result<(), StoreError> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

/// Single JSON object on disk, rewritten on every set.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Opens the file if present. Unreadable or corrupt files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match Self::read(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!("⚠️ [STORE] Could not load {}: {} - starting empty", path.display(), e);
                Map::new()
            }
        };
        info!("[STORE] Opened {} ({} keys)", path.display(), values.len());
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Map<String, Value>, StoreError> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove_all(&self) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap();
        values.clear();
        self.flush(&values)
    }
}
