//! Pre-wired platform harness.
//!
//! Builds an [`Orchestrator`] over a [`MockBackend`], an in-memory usage
//! store, and a temporary models directory with one folder per default
//! model, so integration tests only script behavior and assert outcomes.

use crate::backend::MockBackend;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use textgate_engine::Orchestrator;
use textgate_kernel::{
    MemoryUsageStore, OperationParams, OperationRequest, PlatformConfig, Result,
};

pub const DEFAULT_MODELS: [&str; 3] = ["qwen-summarize", "qwen-translate", "qwen-classify"];

/// A fully wired platform instance plus handles to its collaborators.
pub struct TestPlatform {
    pub orchestrator: Orchestrator,
    pub backend: MockBackend,
    pub store: Arc<MemoryUsageStore>,
    _models: TempDir,
}

impl TestPlatform {
    /// Platform with default limits and lazy loading.
    pub async fn new() -> Result<Self> {
        Self::builder().build().await
    }

    pub fn builder() -> TestPlatformBuilder {
        TestPlatformBuilder::default()
    }
}

pub struct TestPlatformBuilder {
    daily_limit: u64,
    eager_load: bool,
    inference_timeout: Duration,
    load_failures: Vec<(&'static str, &'static str)>,
}

impl Default for TestPlatformBuilder {
    fn default() -> Self {
        Self {
            daily_limit: 1000,
            eager_load: false,
            inference_timeout: Duration::from_secs(5),
            load_failures: Vec::new(),
        }
    }
}

impl TestPlatformBuilder {
    /// Daily request limit seeded for every operation.
    pub fn daily_limit(mut self, limit: u64) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn eager_load(mut self) -> Self {
        self.eager_load = true;
        self
    }

    pub fn inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Script `model` to fail loading before the platform starts, so even
    /// eager loads at startup hit the failure.
    pub fn fail_load(mut self, model: &'static str, message: &'static str) -> Self {
        self.load_failures.push((model, message));
        self
    }

    pub async fn build(self) -> Result<TestPlatform> {
        let models = TempDir::new().map_err(|e| {
            textgate_kernel::PlatformError::Configuration(format!("tempdir: {e}"))
        })?;
        for model in DEFAULT_MODELS {
            std::fs::create_dir(models.path().join(model)).map_err(|e| {
                textgate_kernel::PlatformError::Configuration(format!("mkdir: {e}"))
            })?;
        }

        let mut config = PlatformConfig::default()
            .with_models_dir(models.path())
            .with_eager_load(self.eager_load)
            .with_inference_timeout(self.inference_timeout);
        config.default_daily_limit = self.daily_limit;

        let backend = MockBackend::new();
        for (model, message) in &self.load_failures {
            backend.fail_load(model, message);
        }
        let store = Arc::new(MemoryUsageStore::new());
        let orchestrator = Orchestrator::new(
            Arc::new(config),
            Arc::new(backend.clone()),
            Arc::clone(&store) as Arc<dyn textgate_kernel::UsageStore>,
        )
        .await?;

        Ok(TestPlatform {
            orchestrator,
            backend,
            store,
            _models: models,
        })
    }
}

/// A summarize request comfortably past the minimum-length floor.
pub fn summarize_request() -> OperationRequest {
    OperationRequest::new(OperationParams::Summarize {
        text: "Quarterly revenue grew in every region, driven by the new subscription \
               tier and a one-off licensing deal that closed in March."
            .to_string(),
        max_sentences: 2,
        language: "en".to_string(),
    })
}

pub fn translate_request() -> OperationRequest {
    OperationRequest::new(OperationParams::Translate {
        text: "good morning".to_string(),
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
    })
}

pub fn classify_request(categories: &[&str]) -> OperationRequest {
    OperationRequest::new(OperationParams::Classify {
        text: "my card was charged twice for the same order".to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
    })
}
