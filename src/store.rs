//! Keyed JSON document store with per-key locking.
//!
//! One document per key on disk (`<root>/<key>.json`), mirrored through an
//! in-memory cache. All mutations for a key are serialized behind that key's
//! lock; different keys proceed independently. Writes go through a temp file
//! and rename so a crash never leaves a half-written document.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
};

use anyhow::{bail, Context as _, Result};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, RwLock};

/// Cached state of one document. `loaded` distinguishes "never read from
/// disk" from "read and found absent".
struct Slot<T> {
    loaded: bool,
    value: Option<T>,
}

/// A directory of JSON documents, one per key.
pub struct JsonKeyStore<T> {
    root: PathBuf,
    slots: RwLock<HashMap<String, Arc<Mutex<Slot<T>>>>>,
}

impl<T> JsonKeyStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send,
{
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("failed to create store directory {}", root.display()))?;

        Ok(Self {
            root,
            slots: RwLock::new(HashMap::new()),
        })
    }

    fn file_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            bail!("invalid store key: {key:?}");
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    /// Fetch the per-key slot, creating it on first touch.
    async fn slot(&self, key: &str) -> Arc<Mutex<Slot<T>>> {
        if let Some(slot) = self.slots.read().await.get(key) {
            return slot.clone();
        }

        let mut slots = self.slots.write().await;
        slots
            .entry(key.to_owned())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Slot {
                    loaded: false,
                    value: None,
                }))
            })
            .clone()
    }

    async fn load(&self, key: &str) -> Result<Option<T>> {
        let path = self.file_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to parse document {}", path.display()))?;
                Ok(Some(value))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read document {}", path.display()))
            }
        }
    }

    async fn persist(&self, key: &str, value: &T) -> Result<()> {
        let path = self.file_path(key)?;
        let bytes = serde_json::to_vec_pretty(value).context("failed to serialize document")?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write document {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to commit document {}", path.display()))?;

        Ok(())
    }

    /// Read a document, if present.
    pub async fn get(&self, key: &str) -> Result<Option<T>> {
        let slot = self.slot(key).await;
        let mut guard = slot.lock().await;
        if !guard.loaded {
            guard.value = self.load(key).await?;
            guard.loaded = true;
        }
        Ok(guard.value.clone())
    }

    /// Apply `f` to a document under its key lock.
    ///
    /// `f` receives the current value (`None` when absent) and returns its
    /// result plus whether the document should be persisted. Returning
    /// `false` discards any mutation from durable state, which the award
    /// engine relies on for its rejected-award paths.
    pub async fn update<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Option<T>) -> (R, bool),
    ) -> Result<R> {
        let slot = self.slot(key).await;
        let mut guard = slot.lock().await;
        if !guard.loaded {
            guard.value = self.load(key).await?;
            guard.loaded = true;
        }

        let (out, persist) = f(&mut guard.value);
        if persist {
            match &guard.value {
                Some(value) => self.persist(key, value).await?,
                // Nothing in this subsystem deletes documents.
                None => {}
            }
        } else {
            // Drop the cached copy so a discarded mutation cannot leak into
            // later reads. The next access reloads from disk.
            guard.loaded = false;
            guard.value = None;
        }

        Ok(out)
    }

    /// Every key with a persisted document.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("failed to read store directory {}", self.root.display()))?;

        while let Some(entry) = dir.next_entry().await.context("failed to read store entry")? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_owned());
                }
            }
        }

        Ok(keys)
    }

    /// Read every persisted document.
    pub async fn all(&self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for key in self.keys().await? {
            if let Some(value) = self.get(&key).await? {
                out.push(value);
            }
        }
        Ok(out)
    }
}
