//! Operation results and their execution metadata.

use crate::operation::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata attached to every successful operation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMeta {
    pub operation: Operation,
    /// Identifier of the model that served the request.
    pub model_used: String,
    pub input_chars: usize,
    pub output_tokens: u32,
    /// Wall time from model acquisition to the end of inference.
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Operation-specific success payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationOutput {
    Summarize {
        summary: String,
        sentence_count: usize,
    },
    Translate {
        translated_text: String,
        source_language: String,
        target_language: String,
    },
    Classify {
        label: String,
        /// Confidence for `label`, clamped to 0.0..=1.0.
        confidence: f64,
        scores: HashMap<String, f64>,
    },
}

/// A completed operation: payload plus metadata. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResponse {
    pub output: OperationOutput,
    pub meta: OperationMeta,
}
