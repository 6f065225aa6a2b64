// src/cache.rs

//! Read-through TTL cache over a single JSON document on disk.
//!
//! Expiry is derived from the backing file's modification time plus the TTL,
//! not from an in-memory clock, so repeated short-lived invocations sharing a
//! cache file agree on staleness. A missing or empty file is unconditionally
//! stale. Writes assume a single writer per path, which holds for one cache
//! file per (context, resource-kind) pair.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// File-backed cache of one JSON-serializable value.
#[derive(Debug)]
pub struct TtlCache<T> {
    path: PathBuf,
    ttl: Duration,
    value: Option<T>,
    expiry: Option<SystemTime>,
}

impl<T: Serialize + DeserializeOwned> TtlCache<T> {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
            value: None,
            expiry: None,
        }
    }

    /// Return the cached value, refreshing through `retrieve` when stale.
    ///
    /// On a stale cache the retriever is awaited (callers must assume it is a
    /// costly external call), its result written to the backing file (parent
    /// directories created as needed), and the expiry re-derived from the
    /// fresh file's modification time. On a fresh cache with nothing held in
    /// memory yet, the file's JSON is loaded. Malformed on-disk JSON, write
    /// failures, and retriever errors all propagate.
    pub async fn get<F, Fut>(&mut self, retrieve: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.is_stale()? {
            debug!(path = %self.path.display(), "cache stale; invoking retriever");
            let value = retrieve().await?;
            self.store(value)?;
        } else if self.value.is_none() {
            self.load()?;
        }
        self.value
            .as_ref()
            .context("cache holds no value after refresh")
    }

    fn is_stale(&mut self) -> Result<bool> {
        if self.expiry.is_none() {
            let meta = match fs::metadata(&self.path) {
                Ok(meta) => meta,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("reading metadata for cache file {}", self.path.display())
                    });
                }
            };
            if meta.len() == 0 {
                return Ok(true);
            }
            let modified = meta.modified().with_context(|| {
                format!("reading modification time of {}", self.path.display())
            })?;
            self.expiry = Some(modified + self.ttl);
        }
        Ok(self.expiry.is_some_and(|expiry| expiry < SystemTime::now()))
    }

    fn store(&mut self, value: T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }
        let body = serde_json::to_string(&value).context("serializing cache value")?;
        fs::write(&self.path, body)
            .with_context(|| format!("writing cache file {}", self.path.display()))?;

        let modified = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .with_context(|| {
                format!("reading modification time of {}", self.path.display())
            })?;
        self.expiry = Some(modified + self.ttl);
        self.value = Some(value);
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        debug!(path = %self.path.display(), "loading cached value from disk");
        let body = fs::read_to_string(&self.path)
            .with_context(|| format!("reading cache file {}", self.path.display()))?;
        let value = serde_json::from_str(&body)
            .with_context(|| format!("parsing cached JSON at {}", self.path.display()))?;
        self.value = Some(value);
        Ok(())
    }
}

/// Deterministic cache file path for one (context, resource-kind) pair.
pub fn cache_file_path(context: &str, kind: &str) -> Result<PathBuf> {
    let base = dirs::cache_dir().context("could not determine a user cache directory")?;
    Ok(base.join("kubefan").join(format!("{context}_{kind}.json")))
}
