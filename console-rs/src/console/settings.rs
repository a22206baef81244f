//! Persistent key/value settings.
//!
//! The console keeps its macro table under the `"macros"` key and colour
//! overrides under `<category>-<kind>-color` keys.  Values are arbitrary JSON.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::error::SettingsError;

/// Key/value store that survives the console session.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Json>;

    /// Store `value` under `key`.  Last write wins.
    fn set(&mut self, key: &str, value: Json) -> Result<(), SettingsError>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for Box<S> {
    fn get(&self, key: &str) -> Option<Json> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Json) -> Result<(), SettingsError> {
        (**self).set(key, value)
    }
}

// ── MemorySettings ────────────────────────────────────────────────────────────

/// Settings held only in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: Map<String, Json>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Json> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Json) -> Result<(), SettingsError> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }
}

// ── JsonFileSettings ──────────────────────────────────────────────────────────

/// Settings backed by a JSON object on disk.
///
/// The file is read once by [`JsonFileSettings::open`] and rewritten in full
/// after every [`set`](SettingsStore::set), via a temporary file in the same
/// directory so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Map<String, Json>,
}

impl JsonFileSettings {
    /// Open the settings file at `path`.  A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => {
                let json: Json = serde_json::from_str(&text).map_err(|source| {
                    SettingsError::Json {
                        path: path.clone(),
                        source,
                    }
                })?;
                match json {
                    Json::Object(map) => map,
                    _ => return Err(SettingsError::NotAnObject(path)),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = values.len(), "opened settings file");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            SettingsError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<Json> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Json) -> Result<(), SettingsError> {
        self.values.insert(key.to_owned(), value);
        self.save()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_set_and_get() {
        let mut s = MemorySettings::new();
        assert!(s.get("macros").is_none());
        s.set("macros", json!({"a": "b"})).unwrap();
        assert_eq!(s.get("macros"), Some(json!({"a": "b"})));
        s.set("macros", json!({})).unwrap();
        assert_eq!(s.get("macros"), Some(json!({})));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn file_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let s = JsonFileSettings::open(dir.path().join("nope.json")).unwrap();
        assert!(s.get("macros").is_none());
    }

    #[test]
    fn file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("settings.json");
        {
            let mut s = JsonFileSettings::open(&path).unwrap();
            s.set("macros", json!({"hi": "consoleMessage('general', 'hi')"}))
                .unwrap();
        }
        let s = JsonFileSettings::open(&path).unwrap();
        assert_eq!(
            s.get("macros"),
            Some(json!({"hi": "consoleMessage('general', 'hi')"}))
        );
    }

    #[test]
    fn file_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            JsonFileSettings::open(&path),
            Err(SettingsError::NotAnObject(_))
        ));
    }

    #[test]
    fn file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileSettings::open(&path),
            Err(SettingsError::Json { .. })
        ));
    }
}
