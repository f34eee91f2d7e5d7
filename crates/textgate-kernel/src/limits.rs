//! Per-operation limits and daily usage records.

use crate::operation::Operation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The active limit for one operation.
///
/// One active limit per operation; replaced on administrative update,
/// never deleted. `daily_limit` is admin-mutable at runtime; the size
/// caps come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLimit {
    /// Requests admitted per calendar day. Zero admits nothing.
    pub daily_limit: u64,
    /// Hard cap on input size, in characters.
    pub max_input_chars: usize,
    /// Hard cap on generated tokens per request.
    pub max_output_tokens: u32,
}

impl OperationLimit {
    pub fn new(daily_limit: u64, max_input_chars: usize, max_output_tokens: u32) -> Self {
        Self {
            daily_limit,
            max_input_chars,
            max_output_tokens,
        }
    }

    pub fn with_daily_limit(mut self, daily_limit: u64) -> Self {
        self.daily_limit = daily_limit;
        self
    }
}

/// Key of a usage record: one counter pair per operation per calendar day.
///
/// Date rollover needs no reset job; a new day is simply a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageKey {
    pub operation: Operation,
    pub date: NaiveDate,
}

impl UsageKey {
    pub fn new(operation: Operation, date: NaiveDate) -> Self {
        Self { operation, date }
    }
}

/// Counters for one (operation, date). Created lazily at zero on the
/// first request of a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub request_count: u64,
    pub total_tokens: u64,
}

/// Mutable counter fields of a [`UsageRecord`], for the store's atomic
/// add/decrement operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageField {
    Requests,
    Tokens,
}

/// One row of the read-only usage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationUsage {
    pub operation: Operation,
    pub date: NaiveDate,
    pub request_count: u64,
    pub total_tokens: u64,
    pub daily_limit: u64,
    pub remaining: u64,
}
