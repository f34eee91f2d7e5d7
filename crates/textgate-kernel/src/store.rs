//! Usage store contract and the bundled in-memory implementation.
//!
//! The platform only requires a transactional row store with the atomic
//! operations below; durable backends (SQLite, Redis, ...) drop in behind
//! the same trait. Atomicity is scoped per (operation, date) key so
//! distinct operations never contend with each other.

use crate::limits::{OperationLimit, UsageField, UsageKey, UsageRecord};
use crate::operation::Operation;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use thiserror::Error;

/// Failure reported by a usage store backend.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable counter storage keyed by (operation, date).
///
/// `increment_if_below` is the admission primitive: the check and the
/// increment must be a single atomic unit per key. Adds and decrements
/// are plain commutative counter updates and may interleave freely.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Read the record for a key. Missing records read as all-zero.
    async fn read(&self, key: &UsageKey) -> StoreResult<UsageRecord>;

    /// Atomically increment the request count by `delta` if the result
    /// would not exceed `limit`. Returns whether the increment happened.
    async fn increment_if_below(&self, key: &UsageKey, limit: u64, delta: u64)
    -> StoreResult<bool>;

    /// Atomically add `delta` to one counter field.
    async fn add(&self, key: &UsageKey, field: UsageField, delta: u64) -> StoreResult<()>;

    /// Atomically subtract `delta` from one counter field, clamping at zero.
    async fn decrement(&self, key: &UsageKey, field: UsageField, delta: u64) -> StoreResult<()>;

    /// Create or replace the limit row for an operation.
    async fn upsert_limit(&self, operation: Operation, limit: OperationLimit) -> StoreResult<()>;

    /// Read the limit row for an operation, if one exists.
    async fn read_limit(&self, operation: Operation) -> StoreResult<Option<OperationLimit>>;

    /// All usage records for one date.
    async fn list_usage(&self, date: NaiveDate) -> StoreResult<Vec<(Operation, UsageRecord)>>;
}

/// In-memory [`UsageStore`] on sharded concurrent maps.
///
/// The dashmap entry API holds the shard lock for the duration of a
/// mutation, which makes `increment_if_below` a true compare-and-increment
/// per key. Suitable for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    usage: DashMap<UsageKey, UsageRecord>,
    limits: DashMap<Operation, OperationLimit>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn read(&self, key: &UsageKey) -> StoreResult<UsageRecord> {
        Ok(self.usage.get(key).map(|r| *r).unwrap_or_default())
    }

    async fn increment_if_below(
        &self,
        key: &UsageKey,
        limit: u64,
        delta: u64,
    ) -> StoreResult<bool> {
        let mut record = self.usage.entry(*key).or_default();
        if record.request_count + delta > limit {
            return Ok(false);
        }
        record.request_count += delta;
        Ok(true)
    }

    async fn add(&self, key: &UsageKey, field: UsageField, delta: u64) -> StoreResult<()> {
        let mut record = self.usage.entry(*key).or_default();
        match field {
            UsageField::Requests => record.request_count += delta,
            UsageField::Tokens => record.total_tokens += delta,
        }
        Ok(())
    }

    async fn decrement(&self, key: &UsageKey, field: UsageField, delta: u64) -> StoreResult<()> {
        let mut record = self.usage.entry(*key).or_default();
        match field {
            UsageField::Requests => {
                record.request_count = record.request_count.saturating_sub(delta)
            }
            UsageField::Tokens => record.total_tokens = record.total_tokens.saturating_sub(delta),
        }
        Ok(())
    }

    async fn upsert_limit(&self, operation: Operation, limit: OperationLimit) -> StoreResult<()> {
        self.limits.insert(operation, limit);
        Ok(())
    }

    async fn read_limit(&self, operation: Operation) -> StoreResult<Option<OperationLimit>> {
        Ok(self.limits.get(&operation).map(|l| *l))
    }

    async fn list_usage(&self, date: NaiveDate) -> StoreResult<Vec<(Operation, UsageRecord)>> {
        Ok(self
            .usage
            .iter()
            .filter(|entry| entry.key().date == date)
            .map(|entry| (entry.key().operation, *entry.value()))
            .collect())
    }
}
