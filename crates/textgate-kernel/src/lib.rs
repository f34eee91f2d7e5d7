//! # textgate-kernel
//!
//! Domain types and contracts shared by every textgate crate:
//!
//! - [`Operation`] and the typed request/response model
//! - the [`PlatformError`] taxonomy
//! - per-operation limits and daily usage records
//! - the [`store::UsageStore`] contract plus an in-memory implementation
//! - platform configuration loading
//!
//! Nothing in this crate touches a model or performs I/O beyond the usage
//! store; it exists so the engine, the CLI, and any outer API layer agree
//! on one vocabulary.

pub mod config;
pub mod error;
pub mod limits;
pub mod operation;
pub mod response;
pub mod store;

pub use config::{GenerationDefaults, OperationConfig, PlatformConfig};
pub use error::{InferenceFailure, PlatformError, Result};
pub use limits::{OperationLimit, OperationUsage, UsageField, UsageKey, UsageRecord};
pub use operation::{Operation, OperationParams, OperationRequest};
pub use response::{OperationMeta, OperationOutput, OperationResponse};
pub use store::{MemoryUsageStore, StoreError, UsageStore};
