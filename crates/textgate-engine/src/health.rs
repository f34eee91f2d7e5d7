//! Health and readiness reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use textgate_kernel::Operation;

/// Overall platform status: degraded whenever any configured model is
/// not loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Load status of the model behind one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub operation: Operation,
    pub model_id: String,
    pub path: PathBuf,
    pub loaded: bool,
}

/// Snapshot answered to health/readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub uptime_seconds: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub models: Vec<ModelStatus>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Assemble a report from the current process state. Memory readings
    /// come from sysinfo; on platforms where they are unavailable they
    /// read as zero.
    pub fn collect(uptime: Duration, models: Vec<ModelStatus>) -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        sys.refresh_memory();

        let status = if models.iter().all(|m| m.loaded) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self {
            status,
            uptime_seconds: uptime.as_secs_f64(),
            memory_used_mb: sys.used_memory() / (1024 * 1024),
            memory_total_mb: sys.total_memory() / (1024 * 1024),
            models,
            timestamp: Utc::now(),
        }
    }
}
