//! # textgate-engine
//!
//! The orchestration and admission layer of the textgate platform.
//!
//! Request lifecycle, in strict order:
//!
//! 1. validate the request against the active per-operation limits
//! 2. reserve one request slot in the daily quota ([`LimitService`])
//! 3. acquire a loaded model handle ([`ModelRegistry`], exactly-once load)
//! 4. run generation through the [`backend::InferenceBackend`] boundary
//!    under a deadline and a hard output-token cap
//! 5. commit token usage and assemble the result
//!
//! Failures after step 2 roll the reservation back, so failed attempts do
//! not consume quota.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use textgate_engine::{Orchestrator, StubBackend};
//! use textgate_kernel::{MemoryUsageStore, OperationParams, OperationRequest, PlatformConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(PlatformConfig::default());
//!     let orchestrator = Orchestrator::new(
//!         config,
//!         Arc::new(StubBackend::new()),
//!         Arc::new(MemoryUsageStore::new()),
//!     )
//!     .await
//!     .unwrap();
//!
//!     let request = OperationRequest::new(OperationParams::Classify {
//!         text: "ship it".into(),
//!         categories: vec!["positive".into(), "negative".into()],
//!     });
//!     let response = orchestrator.execute(request).await.unwrap();
//!     println!("{:?}", response.output);
//! }
//! ```

pub mod backend;
pub mod health;
pub mod limiter;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod stub;

pub use backend::{Generation, GenerationRequest, InferenceBackend, ModelInstance, ModelLoadError};
pub use health::{HealthReport, HealthStatus, ModelStatus};
pub use limiter::{AdmissionDecision, LimitService, Reservation};
pub use orchestrator::Orchestrator;
pub use registry::{ModelHandle, ModelRegistry};
pub use stub::StubBackend;
