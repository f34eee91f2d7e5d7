//! Request orchestration.
//!
//! [`Orchestrator::execute`] is the single entry point for operation
//! requests and the only place internal outcomes are mapped to the
//! external error taxonomy. The five steps run in strict sequence:
//! validate, reserve quota, acquire model, infer, commit. That ordering
//! is the contract preventing quota leakage — nothing is debited for
//! requests that never reach inference, and nothing that reached
//! inference escapes accounting.

use crate::backend::{GenerationRequest, InferenceBackend};
use crate::health::HealthReport;
use crate::limiter::{AdmissionDecision, LimitService, Reservation};
use crate::prompts;
use crate::registry::ModelRegistry;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use textgate_kernel::{
    InferenceFailure, OperationMeta, OperationOutput, OperationParams, OperationRequest,
    OperationResponse, PlatformConfig, PlatformError, Result, StoreError, UsageStore,
};

struct OrchestratorInner {
    config: Arc<PlatformConfig>,
    registry: ModelRegistry,
    limits: LimitService,
    started_at: Instant,
}

/// The platform façade: owns the registry and the limit service, serves
/// operation requests, and exposes the administrative surface an API
/// layer consumes.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

impl Orchestrator {
    /// Build the platform from injected collaborators.
    ///
    /// Validates the configuration (every operation must map to an
    /// existing model directory), seeds default limits, and in eager
    /// mode pre-loads every model — failing startup if any load fails.
    pub async fn new(
        config: Arc<PlatformConfig>,
        backend: Arc<dyn InferenceBackend>,
        store: Arc<dyn UsageStore>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = ModelRegistry::new(Arc::clone(&config), backend);
        let limits = LimitService::new(store, Arc::clone(&config));
        limits.seed_defaults().await?;
        if config.eager_load {
            registry.load_all().await?;
        }
        Ok(Self {
            inner: Arc::new(OrchestratorInner {
                config,
                registry,
                limits,
                started_at: Instant::now(),
            }),
        })
    }

    /// The limit service, for the administrative get/put-limit and
    /// usage-snapshot surface.
    pub fn limits(&self) -> &LimitService {
        &self.inner.limits
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.inner.registry
    }

    /// Health/readiness snapshot with per-operation model status.
    pub fn health(&self) -> HealthReport {
        HealthReport::collect(self.inner.started_at.elapsed(), self.inner.registry.statuses())
    }

    /// Run one operation request through the full lifecycle.
    pub async fn execute(&self, request: OperationRequest) -> Result<OperationResponse> {
        let operation = request.operation();

        // Step 1: validation, before any quota or model interaction.
        if !self.inner.config.supports(operation) {
            return Err(PlatformError::Validation(format!(
                "operation '{operation}' is not configured on this platform"
            )));
        }
        request.validate()?;
        let limit = self.inner.limits.limit_for(operation).await?;
        let input_chars = request.params.text().chars().count();
        if input_chars > limit.max_input_chars {
            return Err(PlatformError::Validation(format!(
                "input exceeds hard limit for '{operation}': {input_chars} > {} characters",
                limit.max_input_chars
            )));
        }

        // Step 2: admission. Denial short-circuits before any model cost.
        let reservation = match self.inner.limits.check_and_reserve(operation).await? {
            AdmissionDecision::Admitted(reservation) => reservation,
            AdmissionDecision::Denied { used, limit } => {
                tracing::warn!(operation = %operation, used, limit, "admission denied");
                return Err(PlatformError::QuotaExceeded {
                    operation,
                    used,
                    limit,
                });
            }
        };
        let guard = ReservationGuard::new(self.inner.limits.clone(), reservation);

        // Step 3: model acquisition. The execution clock starts here.
        let clock = Instant::now();
        let model = match self.inner.registry.get_or_load(operation).await {
            Ok(model) => model,
            Err(e) => {
                guard.rollback().await;
                return Err(e);
            }
        };

        // Step 4: inference, under the caller deadline and the hard
        // output-token cap.
        let prompt = build_prompt(&request.params);
        let generation_request = GenerationRequest {
            prompt: &prompt,
            max_new_tokens: limit.max_output_tokens,
            temperature: self.inner.config.generation.temperature,
            top_p: self.inner.config.generation.top_p,
        };
        let deadline = self.inner.config.inference_timeout();
        let generation =
            match tokio::time::timeout(deadline, model.instance().generate(generation_request))
                .await
            {
                Ok(Ok(generation)) => generation,
                Ok(Err(failure)) => {
                    tracing::error!(operation = %operation, error = %failure, "inference failed");
                    guard.rollback().await;
                    return Err(failure.into());
                }
                Err(_) => {
                    tracing::error!(operation = %operation, ?deadline, "inference timed out");
                    guard.rollback().await;
                    return Err(InferenceFailure::Timeout(deadline).into());
                }
            };
        let execution_time_ms = clock.elapsed().as_secs_f64() * 1000.0;

        // Step 5: commit usage, then assemble the result. Inference has
        // consumed the resource, so from here the reservation stands.
        guard.commit(u64::from(generation.output_tokens)).await?;

        let output = assemble_output(&request.params, generation.text);
        tracing::info!(
            operation = %operation,
            model = %model.model_id(),
            input_chars,
            output_tokens = generation.output_tokens,
            time_ms = format_args!("{execution_time_ms:.1}"),
            correlation_id = request.correlation_id.as_deref().unwrap_or("-"),
            "operation complete"
        );

        Ok(OperationResponse {
            output,
            meta: OperationMeta {
                operation,
                model_used: model.model_id().to_string(),
                input_chars,
                output_tokens: generation.output_tokens,
                execution_time_ms,
                correlation_id: request.correlation_id,
                timestamp: Utc::now(),
            },
        })
    }
}

/// Keeps a reservation settled exactly once across every exit path.
///
/// Explicit `rollback` covers the two post-admission failure paths;
/// `commit` confirms success on a spawned task so a caller that goes
/// away mid-await cannot lose consumed usage; `Drop` catches request
/// futures cancelled between reservation and inference completion.
struct ReservationGuard {
    limits: LimitService,
    reservation: Option<Reservation>,
}

impl ReservationGuard {
    fn new(limits: LimitService, reservation: Reservation) -> Self {
        Self {
            limits,
            reservation: Some(reservation),
        }
    }

    /// Credit the reservation back. Its own failure is logged, never
    /// allowed to mask the error that triggered it.
    async fn rollback(mut self) {
        if let Some(reservation) = self.reservation.take() {
            if let Err(e) = self.limits.rollback_reservation(reservation).await {
                tracing::warn!(error = %e, "reservation rollback failed");
            }
        }
    }

    /// Confirm the reservation with the tokens actually produced.
    async fn commit(mut self, tokens: u64) -> Result<()> {
        match self.reservation.take() {
            Some(reservation) => {
                let limits = self.limits.clone();
                let task =
                    tokio::spawn(async move { limits.commit_usage(reservation, tokens).await });
                match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        Err(StoreError::Backend(format!("usage commit task failed: {e}")).into())
                    }
                }
            }
            None => Ok(()),
        }
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if let Some(reservation) = self.reservation.take() {
            let limits = self.limits.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = limits.rollback_reservation(reservation).await {
                        tracing::warn!(error = %e, "rollback of abandoned reservation failed");
                    }
                });
            }
        }
    }
}

fn build_prompt(params: &OperationParams) -> String {
    match params {
        OperationParams::Summarize {
            text,
            max_sentences,
            language,
        } => prompts::summarize(text, *max_sentences, language),
        OperationParams::Translate {
            text,
            source_language,
            target_language,
        } => prompts::translate(text, source_language, target_language),
        OperationParams::Classify { text, categories } => prompts::classify(text, categories),
    }
}

fn assemble_output(params: &OperationParams, generated: String) -> OperationOutput {
    match params {
        OperationParams::Summarize { .. } => {
            let sentence_count = generated
                .split('.')
                .filter(|s| !s.trim().is_empty())
                .count();
            OperationOutput::Summarize {
                summary: generated,
                sentence_count,
            }
        }
        OperationParams::Translate {
            source_language,
            target_language,
            ..
        } => OperationOutput::Translate {
            translated_text: generated,
            source_language: source_language.clone(),
            target_language: target_language.clone(),
        },
        OperationParams::Classify { categories, .. } => {
            let (label, confidence, scores) = parse_classification(&generated, categories);
            OperationOutput::Classify {
                label,
                confidence,
                scores,
            }
        }
    }
}

/// Parse the model's JSON classification, tolerating markdown fences and
/// malformed output: anything unusable falls back to the first category
/// at confidence 0.5.
fn parse_classification(raw: &str, categories: &[String]) -> (String, f64, HashMap<String, f64>) {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed: Option<serde_json::Value> = serde_json::from_str(cleaned).ok();
    if parsed.is_none() {
        let preview: String = raw.chars().take(200).collect();
        tracing::warn!(raw = %preview, "could not parse classification output as JSON");
    }

    let raw_label = parsed
        .as_ref()
        .and_then(|v| v.get("label"))
        .and_then(|l| l.as_str())
        .map(str::to_string);
    let mut confidence = parsed
        .as_ref()
        .and_then(|v| v.get("confidence"))
        .and_then(|c| c.as_f64())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    // Canonicalize against the caller's categories, case-insensitively.
    let label = match raw_label.and_then(|l| {
        categories
            .iter()
            .find(|c| c.to_lowercase() == l.to_lowercase())
    }) {
        Some(canonical) => canonical.clone(),
        None => {
            confidence = 0.5;
            categories[0].clone()
        }
    };

    // The chosen label gets its confidence; the rest share the remainder.
    let share = (1.0 - confidence) / categories.len().saturating_sub(1).max(1) as f64;
    let mut scores: HashMap<String, f64> =
        categories.iter().map(|c| (c.clone(), share)).collect();
    scores.insert(label.clone(), confidence);

    (label, confidence, scores)
}
