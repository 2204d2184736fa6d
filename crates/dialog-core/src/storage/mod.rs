//! Dialog storage
//!
//! Dialogs are persisted through a small hash-table + set interface so they
//! can live in an external key/value store. [`MemoryStorage`] is the
//! in-process implementation.

mod memory;

pub use memory::MemoryStorage;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Storage failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The table, field or set does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored value has the wrong shape (e.g. a counter that is not an integer)
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Async hash-table and set storage
#[async_trait]
pub trait Storage: Send + Sync {
    async fn hset(&self, table: &str, field: &str, value: String) -> StorageResult<()>;

    async fn hset_many(&self, table: &str, fields: Vec<(String, String)>) -> StorageResult<()>;

    /// Fails with `NotFound` when the table or field is absent
    async fn hget(&self, table: &str, field: &str) -> StorageResult<String>;

    /// Fails with `NotFound` when the table is absent
    async fn hget_all(&self, table: &str) -> StorageResult<HashMap<String, String>>;

    async fn hdel(&self, table: &str, field: &str) -> StorageResult<()>;

    /// Adds `delta` to an integer field and returns the new value
    async fn hincr(&self, table: &str, field: &str, delta: i64) -> StorageResult<i64>;

    async fn hdrop(&self, table: &str) -> StorageResult<()>;

    async fn sadd(&self, set: &str, member: String) -> StorageResult<()>;

    async fn sadd_many(&self, set: &str, members: Vec<String>) -> StorageResult<()>;

    async fn srem(&self, set: &str, member: &str) -> StorageResult<()>;

    async fn sget_all(&self, set: &str) -> StorageResult<Vec<String>>;

    async fn sdrop(&self, set: &str) -> StorageResult<()>;
}
