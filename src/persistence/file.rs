//! JSON file store (native)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StoreError};

const APP_DIR: &str = "reflex-rush";
const FILENAME: &str = "store.json";

/// All keys in one JSON object file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under `$XDG_CONFIG_HOME/reflex-rush` or `~/.config/reflex-rush`
    pub fn in_config_dir() -> Self {
        let base = match std::env::var("XDG_CONFIG_HOME") {
            Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
            _ => std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".config"))
                .unwrap_or_else(|_| PathBuf::from(".")),
        };
        Self::new(base.join(APP_DIR).join(FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("reflex-rush-test-{}-{}", name, std::process::id()))
            .join(FILENAME)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let store = JsonFileStore::new(temp_path("missing"));
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let path = temp_path("roundtrip");
        let mut store = JsonFileStore::new(&path);
        store.set_bool("tutorialComplete", true).unwrap();
        store.set("other", "value").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get_bool("tutorialComplete").unwrap(), Some(true));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("value"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("k"), Err(StoreError::Json(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
