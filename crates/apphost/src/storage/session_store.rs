//! Short-lived key-value storage scoped to the browser session.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("session storage is unavailable")]
    Unavailable,
    #[error("session storage quota exceeded ({requested} bytes requested, {remaining} remaining)")]
    QuotaExceeded { requested: usize, remaining: usize },
}

/// `sessionStorage`-shaped store. Writes may fail; callers decide how to degrade.
pub trait SessionStorage: Send + Sync {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn get_item(&self, key: &str) -> Option<String>;
    fn remove_item(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
}
