use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwap;
use snafu::{ResultExt, Snafu};

/// Client-side key-value persistence surface.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> PreferenceResult<()>;
    fn remove(&self, key: &str) -> PreferenceResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> PreferenceResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> PreferenceResult<()> {
        (**self).remove(key)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PreferenceError {
    #[snafu(display("failed to create preferences directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize preferences on `{stage}`: {source}"))]
    SerializePreferences {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write preferences file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace preferences file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

pub type PreferenceResult<T> = Result<T, PreferenceError>;

/// Process-local store for tests and hosts without a writable profile.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> PreferenceResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PreferenceResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

type Entries = BTreeMap<String, String>;

/// JSON-object file store. Reads are served from an in-memory copy; every write
/// replaces the file atomically.
pub struct JsonFileStore {
    entries: ArcSwap<Entries>,
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load_from_disk(&path);
        Self {
            entries: ArcSwap::from_pointee(entries),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Entries {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("preferences file not found at {:?}, starting empty", path);
                return Entries::new();
            }
            Err(error) => {
                tracing::warn!(
                    "failed to read preferences from {:?}: {}. starting empty",
                    path,
                    error
                );
                return Entries::new();
            }
        };

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    "failed to parse preferences from {:?}: {}. starting empty",
                    path,
                    error
                );
                Entries::new()
            }
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Entries)) -> PreferenceResult<()> {
        let mut next = Entries::clone(&self.entries.load());
        apply(&mut next);
        self.persist(&next)?;
        self.entries.store(Arc::new(next));
        Ok(())
    }

    fn persist(&self, entries: &Entries) -> PreferenceResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-preferences-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(entries).context(SerializePreferencesSnafu {
            stage: "serialize-preferences-json",
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-preferences-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.path).context(RenameTempFileSnafu {
            stage: "rename-temporary-preferences-file",
            from: temp_path,
            to: self.path.clone(),
        })?;

        tracing::debug!("saved preferences to {:?}", self.path);
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.load().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> PreferenceResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> PreferenceResult<()> {
        if !self.entries.load().contains_key(key) {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let store = MemoryStore::new();
        store.set("k", "1".to_string()).expect("set");
        assert_eq!(store.get("k").as_deref(), Some("1"));
        store.remove("k").expect("remove");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("preferences.json");

        let store = JsonFileStore::open(&path);
        store.set("chatPanelWidth", "512".to_string()).expect("set");
        drop(store);

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("chatPanelWidth").as_deref(), Some("512"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_remove_is_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("preferences.json");

        let store = JsonFileStore::open(&path);
        store.set("a", "1".to_string()).expect("set a");
        store.set("b", "2".to_string()).expect("set b");
        store.remove("a").expect("remove a");

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "{not json").expect("write fixture");

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("chatPanelWidth"), None);
    }
}
