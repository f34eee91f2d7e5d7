//! The inference boundary.
//!
//! Everything past these traits is opaque compute: tokenization,
//! attention, decoding are the backend's business. The orchestration layer
//! only relies on the contract that `generate` never produces more than
//! `max_new_tokens` tokens (by truncation or by stopping generation) and
//! reports the count it did produce.

use std::path::Path;
use std::sync::Arc;
use textgate_kernel::InferenceFailure;
use thiserror::Error;

/// Failure to bring a model into memory: missing files, corrupt weights,
/// incompatible format. Fatal for the operation until corrected, never
/// for the process.
///
/// Cloneable so a single failed load can be reported to every concurrent
/// waiter.
#[derive(Debug, Clone, Error)]
#[error("model load failed: {0}")]
pub struct ModelLoadError(pub String);

/// One generation call into a loaded model.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    /// Hard decoding cap. The backend must not exceed it.
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Output of a generation call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub output_tokens: u32,
}

/// A loaded model instance. Shared read-only across concurrent calls;
/// whatever internal serialization the compute model needs is the
/// implementation's responsibility.
#[async_trait::async_trait]
pub trait ModelInstance: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<Generation, InferenceFailure>;
}

/// Loads model weights from the local filesystem into instances.
///
/// Implementations decide the format (GGUF, safetensors, ...) and the
/// compute placement; callers only see [`ModelInstance`] handles.
#[async_trait::async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name, for logs and health output.
    fn name(&self) -> &str;

    /// Load the weights under `path` into a ready instance.
    async fn load(
        &self,
        model_id: &str,
        path: &Path,
    ) -> Result<Arc<dyn ModelInstance>, ModelLoadError>;
}
