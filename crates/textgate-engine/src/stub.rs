//! Deterministic no-weights backend.
//!
//! Used by the CLI for dry runs and as the reference implementation of the
//! boundary contract. It honors the load-time path check and the
//! `max_new_tokens` cap, and reports token counts, so every orchestration
//! path can be exercised without model weights.

use crate::backend::{Generation, GenerationRequest, InferenceBackend, ModelInstance, ModelLoadError};
use std::path::Path;
use std::sync::Arc;
use textgate_kernel::InferenceFailure;

/// Backend whose "models" echo a bounded prefix of the prompt tail.
#[derive(Debug, Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl InferenceBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn load(
        &self,
        model_id: &str,
        path: &Path,
    ) -> Result<Arc<dyn ModelInstance>, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError(format!(
                "model directory not found: {}",
                path.display()
            )));
        }
        tracing::info!(model = %model_id, path = %path.display(), "stub model ready");
        Ok(Arc::new(StubModel {
            model_id: model_id.to_string(),
        }))
    }
}

struct StubModel {
    model_id: String,
}

#[async_trait::async_trait]
impl ModelInstance for StubModel {
    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<Generation, InferenceFailure> {
        // One word stands in for one token; the cap still binds.
        let words: Vec<&str> = request.prompt.split_whitespace().collect();
        let take = (request.max_new_tokens as usize).min(words.len());
        let start = words.len() - take;
        let text = words[start..].join(" ");

        tracing::debug!(
            model = %self.model_id,
            prompt_words = words.len(),
            output_tokens = take,
            "stub generation"
        );

        Ok(Generation {
            text,
            output_tokens: take as u32,
        })
    }
}
