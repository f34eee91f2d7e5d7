//! textgate testing framework
//!
//! Provides a programmable mock inference backend and a pre-wired
//! platform harness, so orchestration behavior can be tested
//! deterministically without model weights.

pub mod harness;

pub use backend::MockBackend;
pub use harness::TestPlatform;
