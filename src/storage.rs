// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistent client-side key/value storage.
//!
//! Holds the cached session, one OTP challenge per email, and the OAuth
//! token with its expiry. Values are strings (usually JSON) and the whole
//! map is written back to a single JSON file on every mutation.

use crate::error::{AppError, Result};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Storage key names as constants.
pub mod keys {
    pub const SESSION: &str = "nomadic_user_session";
    pub const OAUTH_TOKEN: &str = "google_oauth_token";
    pub const OAUTH_EXPIRES: &str = "google_oauth_expires";

    /// Key of the OTP challenge for `email`.
    pub fn otp(email: &str) -> String {
        format!("nomadic_otp_{}", email)
    }
}

/// Key/value store shared by every service of one client instance.
#[derive(Clone)]
pub struct ClientStorage {
    entries: Arc<DashMap<String, String>>,
    /// Backing file; `None` keeps everything in memory.
    path: Option<Arc<PathBuf>>,
    /// Serializes file writes.
    write_lock: Arc<Mutex<()>>,
}

impl ClientStorage {
    /// Open (or create) storage backed by the JSON file at `path`.
    ///
    /// A corrupt file is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => {
                    for (k, v) in map {
                        entries.insert(k, v);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Client state unreadable, starting empty");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::debug!(path = %path.display(), keys = entries.len(), "Client storage opened");

        Ok(Self {
            entries: Arc::new(entries),
            path: Some(Arc::new(path)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Create in-memory storage for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            path: None,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<()> {
        self.entries.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Read and decode a JSON value.
    ///
    /// Undecodable values are reported as absent rather than as errors.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring undecodable client state entry");
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::Storage(format!("Failed to encode {}: {}", key, e)))?;
        self.set(key, raw)
    }

    /// Write the whole map back to disk (no-op for in-memory storage).
    pub fn flush(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        write_atomically(path, &snapshot)
    }
}

fn write_atomically(path: &Path, snapshot: &BTreeMap<String, String>) -> Result<()> {
    let storage_err =
        |e: std::io::Error| AppError::Storage(format!("Failed to write {}: {}", path.display(), e));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(storage_err)?;
        }
    }

    let body = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| AppError::Storage(format!("Failed to encode client state: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body).map_err(storage_err)?;
    std::fs::rename(&tmp, path).map_err(storage_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let storage = ClientStorage::open(&path).unwrap();
        storage.set(keys::OAUTH_TOKEN, "ya29.token").unwrap();
        storage.set("scratch", "1").unwrap();
        storage.remove("scratch").unwrap();

        let reopened = ClientStorage::open(&path).unwrap();
        assert_eq!(reopened.get(keys::OAUTH_TOKEN).as_deref(), Some("ya29.token"));
        assert!(!reopened.contains("scratch"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = ClientStorage::open(&path).unwrap();
        assert!(storage.get(keys::SESSION).is_none());
    }

    #[test]
    fn test_undecodable_json_entry_reads_as_absent() {
        let storage = ClientStorage::new_mock();
        storage.set(keys::SESSION, "{\"uid\":").unwrap();

        let value: Option<serde_json::Value> = storage.get_json(keys::SESSION);
        assert!(value.is_none());
    }
}
