use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Storage, StorageError, StorageResult};

/// In-process [`Storage`] backed by sharded maps.
///
/// Every operation locks a single shard entry, so per-key updates such as
/// [`Storage::hincr`] are atomic.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: DashMap<String, HashMap<String, String>>,
    sets: DashMap<String, HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hash tables currently stored
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

fn table_not_found(table: &str) -> StorageError {
    StorageError::NotFound(format!("table '{}'", table))
}

fn field_not_found(table: &str, field: &str) -> StorageError {
    StorageError::NotFound(format!("table '{}' or field '{}'", table, field))
}

fn set_not_found(set: &str) -> StorageError {
    StorageError::NotFound(format!("set '{}'", set))
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn hset(&self, table: &str, field: &str, value: String) -> StorageResult<()> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hset_many(&self, table: &str, fields: Vec<(String, String)>) -> StorageResult<()> {
        self.tables.entry(table.to_string()).or_default().extend(fields);
        Ok(())
    }

    async fn hget(&self, table: &str, field: &str) -> StorageResult<String> {
        self.tables
            .get(table)
            .and_then(|t| t.get(field).cloned())
            .ok_or_else(|| field_not_found(table, field))
    }

    async fn hget_all(&self, table: &str) -> StorageResult<HashMap<String, String>> {
        self.tables
            .get(table)
            .map(|t| t.value().clone())
            .ok_or_else(|| table_not_found(table))
    }

    async fn hdel(&self, table: &str, field: &str) -> StorageResult<()> {
        self.tables
            .get_mut(table)
            .and_then(|mut t| t.remove(field))
            .map(|_| ())
            .ok_or_else(|| field_not_found(table, field))
    }

    async fn hincr(&self, table: &str, field: &str, delta: i64) -> StorageResult<i64> {
        let mut t = self.tables.get_mut(table).ok_or_else(|| field_not_found(table, field))?;
        let value = t.get_mut(field).ok_or_else(|| field_not_found(table, field))?;
        let current: i64 = value.parse().map_err(|_| StorageError::InvalidValue {
            key: format!("{}.{}", table, field),
            reason: format!("{:?} is not an integer", value),
        })?;
        let next = current.checked_add(delta).ok_or_else(|| StorageError::InvalidValue {
            key: format!("{}.{}", table, field),
            reason: format!("{} + {} overflows", current, delta),
        })?;
        *value = next.to_string();
        Ok(next)
    }

    async fn hdrop(&self, table: &str) -> StorageResult<()> {
        self.tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| table_not_found(table))
    }

    async fn sadd(&self, set: &str, member: String) -> StorageResult<()> {
        self.sets.entry(set.to_string()).or_default().insert(member);
        Ok(())
    }

    async fn sadd_many(&self, set: &str, members: Vec<String>) -> StorageResult<()> {
        self.sets.entry(set.to_string()).or_default().extend(members);
        Ok(())
    }

    async fn srem(&self, set: &str, member: &str) -> StorageResult<()> {
        let removed = self
            .sets
            .get_mut(set)
            .map(|mut s| s.remove(member))
            .unwrap_or(false);
        if removed {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("set '{}' or member '{}'", set, member)))
        }
    }

    async fn sget_all(&self, set: &str) -> StorageResult<Vec<String>> {
        self.sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .ok_or_else(|| set_not_found(set))
    }

    async fn sdrop(&self, set: &str) -> StorageResult<()> {
        self.sets
            .remove(set)
            .map(|_| ())
            .ok_or_else(|| set_not_found(set))
    }
}
