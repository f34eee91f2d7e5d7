//! Admission control and usage accounting.
//!
//! Quota accounting is two-phase: `check_and_reserve` atomically debits
//! one request slot before inference runs, and the slot is either
//! confirmed by `commit_usage` or credited back by
//! `rollback_reservation`. The [`Reservation`] token is consumed by value
//! by both, so a reservation can be settled exactly once — double
//! rollback is unrepresentable.
//!
//! "Today" is computed per request from the wall clock and carried inside
//! the reservation, so date rollover needs no reset job and a rollback
//! that straddles midnight credits the day that was debited.

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use textgate_kernel::{
    Operation, OperationLimit, OperationUsage, PlatformConfig, PlatformError, Result, UsageField,
    UsageKey, UsageRecord, UsageStore,
};

/// Outcome of an admission check.
#[derive(Debug)]
pub enum AdmissionDecision {
    /// One request slot was reserved; settle it with
    /// [`LimitService::commit_usage`] or
    /// [`LimitService::rollback_reservation`].
    Admitted(Reservation),
    /// Quota exhausted. Counts observed at the denial instant.
    Denied { used: u64, limit: u64 },
}

/// A provisional quota debit. Not cloneable: whoever holds it settles it
/// once.
#[derive(Debug)]
pub struct Reservation {
    operation: Operation,
    date: NaiveDate,
}

impl Reservation {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    fn key(&self) -> UsageKey {
        UsageKey::new(self.operation, self.date)
    }
}

struct LimitInner {
    store: Arc<dyn UsageStore>,
    config: Arc<PlatformConfig>,
}

/// Per-operation daily quota enforcement over a [`UsageStore`].
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct LimitService {
    inner: Arc<LimitInner>,
}

impl LimitService {
    pub fn new(store: Arc<dyn UsageStore>, config: Arc<PlatformConfig>) -> Self {
        Self {
            inner: Arc::new(LimitInner { store, config }),
        }
    }

    /// Seed a limit row for every configured operation that has none.
    pub async fn seed_defaults(&self) -> Result<()> {
        for operation in Operation::ALL {
            let Some(seed) = self.inner.config.seed_limit(operation) else {
                continue;
            };
            if self.inner.store.read_limit(operation).await?.is_none() {
                self.inner.store.upsert_limit(operation, seed).await?;
                tracing::debug!(operation = %operation, daily_limit = seed.daily_limit, "seeded limit");
            }
        }
        Ok(())
    }

    /// The active limit for an operation: the stored row, or the config
    /// seed if the store has none yet.
    pub async fn limit_for(&self, operation: Operation) -> Result<OperationLimit> {
        if let Some(limit) = self.inner.store.read_limit(operation).await? {
            return Ok(limit);
        }
        self.inner.config.seed_limit(operation).ok_or_else(|| {
            PlatformError::Configuration(format!("no limit configured for '{operation}'"))
        })
    }

    /// Check the daily quota and reserve one request slot.
    ///
    /// The check and the increment are a single atomic unit per
    /// (operation, date) key, so concurrent admissions can never jointly
    /// exceed the limit. Distinct operations do not contend.
    pub async fn check_and_reserve(&self, operation: Operation) -> Result<AdmissionDecision> {
        let limit = self.limit_for(operation).await?;
        let date = today();
        let key = UsageKey::new(operation, date);

        if self
            .inner
            .store
            .increment_if_below(&key, limit.daily_limit, 1)
            .await?
        {
            Ok(AdmissionDecision::Admitted(Reservation { operation, date }))
        } else {
            let record = self.inner.store.read(&key).await?;
            Ok(AdmissionDecision::Denied {
                used: record.request_count,
                limit: limit.daily_limit,
            })
        }
    }

    /// Confirm a reservation, recording the tokens inference actually
    /// produced. Never denies; token accounting is informational after
    /// admission.
    pub async fn commit_usage(&self, reservation: Reservation, tokens: u64) -> Result<()> {
        self.inner
            .store
            .add(&reservation.key(), UsageField::Tokens, tokens)
            .await?;
        tracing::debug!(
            operation = %reservation.operation,
            tokens,
            "usage committed"
        );
        Ok(())
    }

    /// Credit back a reservation whose inference never completed, so the
    /// failed attempt does not consume quota.
    pub async fn rollback_reservation(&self, reservation: Reservation) -> Result<()> {
        self.inner
            .store
            .decrement(&reservation.key(), UsageField::Requests, 1)
            .await?;
        tracing::debug!(operation = %reservation.operation, "reservation rolled back");
        Ok(())
    }

    /// Replace the daily limit for an operation. Takes effect for the
    /// next admission check; already-committed usage is untouched.
    pub async fn update_limit(
        &self,
        operation: Operation,
        daily_limit: u64,
    ) -> Result<OperationLimit> {
        let updated = self.limit_for(operation).await?.with_daily_limit(daily_limit);
        self.inner.store.upsert_limit(operation, updated).await?;
        tracing::info!(operation = %operation, daily_limit, "daily limit updated");
        Ok(updated)
    }

    /// Active limits for every configured operation.
    pub async fn limits(&self) -> Result<Vec<(Operation, OperationLimit)>> {
        let mut all = Vec::new();
        for operation in Operation::ALL {
            if self.inner.config.supports(operation) {
                all.push((operation, self.limit_for(operation).await?));
            }
        }
        Ok(all)
    }

    /// Read-only usage report for the current date. Operations without a
    /// usage row yet report zeros.
    pub async fn usage_snapshot(
        &self,
        operation: Option<Operation>,
    ) -> Result<Vec<OperationUsage>> {
        let date = today();
        let records: HashMap<Operation, UsageRecord> =
            self.inner.store.list_usage(date).await?.into_iter().collect();

        let mut snapshot = Vec::new();
        for op in Operation::ALL {
            if !self.inner.config.supports(op) {
                continue;
            }
            if operation.is_some_and(|wanted| wanted != op) {
                continue;
            }
            let limit = self.limit_for(op).await?;
            let record = records.get(&op).copied().unwrap_or_default();
            snapshot.push(OperationUsage {
                operation: op,
                date,
                request_count: record.request_count,
                total_tokens: record.total_tokens,
                daily_limit: limit.daily_limit,
                remaining: limit.daily_limit.saturating_sub(record.request_count),
            });
        }
        Ok(snapshot)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
