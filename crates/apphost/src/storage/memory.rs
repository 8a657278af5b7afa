//! In-memory session storage with an optional byte quota.

use std::collections::HashMap;
use std::sync::Mutex;

use super::session_store::{SessionStorage, StorageError};

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    data: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    unavailable: bool,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys plus values exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Storage that rejects every write, like a sandboxed frame.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        let mut data = self.data.lock().map_err(|_| StorageError::Unavailable)?;

        if let Some(quota) = self.quota_bytes {
            let used: usize = data
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = key.len() + value.len();
            let remaining = quota.saturating_sub(used);
            if requested > remaining {
                return Err(StorageError::QuotaExceeded {
                    requested,
                    remaining,
                });
            }
        }

        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.data.lock().ok()?.get(key).cloned()
    }

    fn remove_item(&self, key: &str) -> bool {
        self.data
            .lock()
            .map(|mut data| data.remove(key).is_some())
            .unwrap_or(false)
    }

    fn keys(&self) -> Vec<String> {
        self.data
            .lock()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default()
    }
}
