//! Durable string key/value storage.
//!
//! Everything the app persists goes through [`PersistentStore`]: the task list
//! and the theme preference each live under their own key as a plain string.
//! [`FileStore`] keeps all keys in a single JSON object on disk and rewrites it
//! atomically on every `set`; [`MemoryStore`] is the in-process variant.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const STORE_FILE_NAME: &str = "storage.json";

/// Synchronous string key/value store.
///
/// Reads never fail: a missing key is `None`. Writes report I/O failures to
/// the caller.
pub trait PersistentStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

impl<T: PersistentStore + ?Sized> PersistentStore for &T {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }
}

impl<T: PersistentStore + ?Sized> PersistentStore for Rc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RefCell::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key/value store backed by `<data_dir>/storage.json`.
///
/// The whole object is cached in memory after `open`; the cache is only
/// updated once the new file has been persisted.
#[derive(Debug)]
pub struct FileStore {
    pub data_dir: PathBuf,
    pub path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let path = data_dir.join(STORE_FILE_NAME);
        if !path.exists() {
            fs::write(&path, "{}\n")
                .with_context(|| format!("failed to create {}", path.display()))?;
        }

        let entries = load_entries(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;

        info!(
            data_dir = %data_dir.display(),
            store = %path.display(),
            keys = entries.len(),
            "opened file store"
        );

        Ok(Self {
            data_dir,
            path,
            entries: RefCell::new(entries),
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    #[tracing::instrument(skip(self, value), fields(len = value.len()))]
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut next = self.entries.borrow().clone();
        next.insert(key.to_string(), value.to_string());

        save_entries_atomic(&self.path, &next)
            .with_context(|| format!("failed to write key {key} to {}", self.path.display()))?;

        *self.entries.borrow_mut() = next;
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_entries(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    debug!(file = %path.display(), "loading store entries");
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let entries: BTreeMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON object of strings", path.display()))?;

    debug!(count = entries.len(), "loaded store entries");
    Ok(entries)
}

#[tracing::instrument(skip(path, entries))]
fn save_entries_atomic(path: &Path, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = entries.len(), "saving store atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, entries)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
