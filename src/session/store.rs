//! Key-value stores backing the session (the browser's local storage,
//! reduced to get/put/remove on strings).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{LockError, LockResult};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> LockResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> LockResult<()>;
    fn remove(&self, key: &str) -> LockResult<()>;

    /// Puts (`Some`) and removes (`None`) applied as one change where the
    /// store supports it.
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> LockResult<()> {
        for (key, value) in changes {
            match value {
                Some(value) => self.put(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

fn apply_to(entries: &mut BTreeMap<String, String>, changes: &[(&str, Option<&str>)]) {
    for (key, value) in changes {
        match value {
            Some(value) => entries.insert(key.to_string(), value.to_string()),
            None => entries.remove(*key),
        };
    }
}

/// Process-local store, for tests and embedding hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> LockResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| LockError::Other("memory store lock".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> LockResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> LockResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> LockResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> LockResult<()> {
        apply_to(&mut *self.entries()?, changes);
        Ok(())
    }
}

/// JSON object on disk. Every change rewrites a sibling `.tmp` file and
/// renames it over the original, so readers see the old or the new map.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // serialises read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl FileStore {
    pub const FILE_NAME: &'static str = "local-storage.json";

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    /// `<data_dir>/local-storage.json`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::open(data_dir.as_ref().join(Self::FILE_NAME))
    }

    #[cfg(feature = "native")]
    pub fn for_app(config: &crate::config::AppConfig) -> Self {
        Self::in_dir(config.data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> LockResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> LockResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> LockResult<()> {
        let _guard = self.guard.lock().map_err(|_| LockError::Other("file store lock".into()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> LockResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> LockResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> LockResult<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> LockResult<()> {
        self.modify(|entries| apply_to(entries, changes))
    }
}
