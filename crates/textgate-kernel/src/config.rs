//! Platform configuration.
//!
//! Loaded once at startup from a TOML file with `TEXTGATE_*` environment
//! overrides, or built in code for tests. Defaults mirror a typical
//! on-premise deployment with one Qwen checkpoint per operation.

use crate::error::{PlatformError, Result};
use crate::limits::OperationLimit;
use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Static configuration for one operation: which model serves it and the
/// hard size caps that bound every request regardless of admin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationConfig {
    /// Model folder name inside `models_dir`.
    pub model: String,
    pub max_input_chars: usize,
    pub max_output_tokens: u32,
    /// Seed value for the admin-mutable daily limit. Falls back to
    /// [`PlatformConfig::default_daily_limit`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<u64>,
}

/// Sampling defaults applied to every generation call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
        }
    }
}

/// Top-level platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Directory holding one subfolder of weights per model.
    pub models_dir: PathBuf,
    /// Operation → model mapping with per-operation caps.
    #[serde(default = "default_operations")]
    pub operations: HashMap<Operation, OperationConfig>,
    /// Daily request limit seeded for operations without an explicit one.
    #[serde(default = "default_daily_limit")]
    pub default_daily_limit: u64,
    /// Pre-load every configured model before serving. With eager loading
    /// a single failed load aborts startup instead of degrading silently.
    #[serde(default)]
    pub eager_load: bool,
    /// Deadline for one inference call, in seconds.
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,
    #[serde(default)]
    pub generation: GenerationDefaults,
}

fn default_daily_limit() -> u64 {
    1000
}

fn default_inference_timeout_secs() -> u64 {
    120
}

fn default_operations() -> HashMap<Operation, OperationConfig> {
    HashMap::from([
        (
            Operation::Summarize,
            OperationConfig {
                model: "qwen-summarize".to_string(),
                max_input_chars: 8000,
                max_output_tokens: 512,
                daily_limit: None,
            },
        ),
        (
            Operation::Translate,
            OperationConfig {
                model: "qwen-translate".to_string(),
                max_input_chars: 4000,
                max_output_tokens: 512,
                daily_limit: None,
            },
        ),
        (
            Operation::Classify,
            OperationConfig {
                model: "qwen-classify".to_string(),
                max_input_chars: 2000,
                max_output_tokens: 64,
                daily_limit: None,
            },
        ),
    ])
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            operations: default_operations(),
            default_daily_limit: default_daily_limit(),
            eager_load: false,
            inference_timeout_secs: default_inference_timeout_secs(),
            generation: GenerationDefaults::default(),
        }
    }
}

impl PlatformConfig {
    /// Load from a TOML file, then apply `TEXTGATE_*` environment
    /// overrides (e.g. `TEXTGATE_MODELS_DIR`, `TEXTGATE_EAGER_LOAD`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("TEXTGATE").separator("__"))
            .build()
            .map_err(|e| PlatformError::Configuration(e.to_string()))?;
        cfg.try_deserialize()
            .map_err(|e| PlatformError::Configuration(e.to_string()))
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn with_eager_load(mut self, eager: bool) -> Self {
        self.eager_load = eager;
        self
    }

    pub fn with_inference_timeout(mut self, timeout: Duration) -> Self {
        self.inference_timeout_secs = timeout.as_secs();
        self
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains_key(&operation)
    }

    pub fn operation(&self, operation: Operation) -> Option<&OperationConfig> {
        self.operations.get(&operation)
    }

    /// Model folder path for an operation, if configured.
    pub fn model_path(&self, operation: Operation) -> Option<PathBuf> {
        self.operations
            .get(&operation)
            .map(|op| self.models_dir.join(&op.model))
    }

    /// The limit row seeded for an operation at startup.
    pub fn seed_limit(&self, operation: Operation) -> Option<OperationLimit> {
        self.operations.get(&operation).map(|op| {
            OperationLimit::new(
                op.daily_limit.unwrap_or(self.default_daily_limit),
                op.max_input_chars,
                op.max_output_tokens,
            )
        })
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// Startup validation: every configured operation must point at an
    /// existing model directory.
    pub fn validate(&self) -> Result<()> {
        if self.operations.is_empty() {
            return Err(PlatformError::Configuration(
                "no operations configured".into(),
            ));
        }
        for (operation, op_config) in &self.operations {
            if op_config.model.trim().is_empty() {
                return Err(PlatformError::Configuration(format!(
                    "operation '{operation}' has an empty model name"
                )));
            }
            if op_config.max_input_chars == 0 || op_config.max_output_tokens == 0 {
                return Err(PlatformError::Configuration(format!(
                    "operation '{operation}' must have non-zero size caps"
                )));
            }
            let path = self.models_dir.join(&op_config.model);
            if !path.exists() {
                return Err(PlatformError::Configuration(format!(
                    "model directory for '{operation}' not found: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}
