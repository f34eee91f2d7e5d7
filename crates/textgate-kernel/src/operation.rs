//! Operations and typed, validated operation requests.

use crate::error::{PlatformError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language codes the translate operation accepts.
pub const SUPPORTED_LANGUAGES: [&str; 10] =
    ["en", "ar", "fr", "de", "es", "zh", "ja", "ko", "ru", "pt"];

const MAX_CORRELATION_ID_LEN: usize = 64;

/// A supported text-processing operation.
///
/// Each operation has its own model mapping, hard size caps, and daily
/// quota. The enum is open to extension; everything keyed by operation
/// (store records, config maps) treats it as an opaque name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Operation {
    Summarize,
    Translate,
    Classify,
}

impl Operation {
    /// All operations the platform currently supports.
    pub const ALL: [Operation; 3] = [
        Operation::Summarize,
        Operation::Translate,
        Operation::Classify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Summarize => "summarize",
            Operation::Translate => "translate",
            Operation::Classify => "classify",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "summarize" => Ok(Operation::Summarize),
            "translate" => Ok(Operation::Translate),
            "classify" => Ok(Operation::Classify),
            other => Err(PlatformError::Validation(format!(
                "unknown operation '{other}'"
            ))),
        }
    }
}

/// Operation-specific parameters.
///
/// Serialized with an `operation` tag so a request body is
/// self-describing, e.g. `{"operation": "summarize", "text": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum OperationParams {
    Summarize {
        text: String,
        #[serde(default = "default_max_sentences")]
        max_sentences: u8,
        /// ISO 639-1 code of the summary language.
        #[serde(default = "default_language")]
        language: String,
    },
    Translate {
        text: String,
        source_language: String,
        target_language: String,
    },
    Classify {
        text: String,
        /// Candidate category labels, 2–20 unique entries.
        categories: Vec<String>,
    },
}

fn default_max_sentences() -> u8 {
    5
}

fn default_language() -> String {
    "en".to_string()
}

impl OperationParams {
    pub fn operation(&self) -> Operation {
        match self {
            OperationParams::Summarize { .. } => Operation::Summarize,
            OperationParams::Translate { .. } => Operation::Translate,
            OperationParams::Classify { .. } => Operation::Classify,
        }
    }

    /// The raw input payload the size caps apply to.
    pub fn text(&self) -> &str {
        match self {
            OperationParams::Summarize { text, .. }
            | OperationParams::Translate { text, .. }
            | OperationParams::Classify { text, .. } => text,
        }
    }

    /// Field-level validation, independent of the admin-mutable size caps
    /// (those are enforced by the orchestrator against the active
    /// [`crate::limits::OperationLimit`]).
    pub fn validate(&self) -> Result<()> {
        if self.text().trim().is_empty() {
            return Err(PlatformError::Validation(
                "text must not consist solely of whitespace".into(),
            ));
        }

        match self {
            OperationParams::Summarize {
                text,
                max_sentences,
                language,
            } => {
                if text.trim().len() < 50 {
                    return Err(PlatformError::Validation(
                        "summarize text must be at least 50 characters".into(),
                    ));
                }
                if !(1..=20).contains(max_sentences) {
                    return Err(PlatformError::Validation(
                        "max_sentences must be between 1 and 20".into(),
                    ));
                }
                validate_language_code(language)?;
            }
            OperationParams::Translate {
                source_language,
                target_language,
                ..
            } => {
                validate_supported_language(source_language)?;
                validate_supported_language(target_language)?;
                if source_language == target_language {
                    return Err(PlatformError::Validation(
                        "source_language and target_language must differ".into(),
                    ));
                }
            }
            OperationParams::Classify { categories, .. } => {
                let cleaned: Vec<&str> = categories
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect();
                if cleaned.len() < 2 {
                    return Err(PlatformError::Validation(
                        "at least 2 non-empty category labels are required".into(),
                    ));
                }
                if cleaned.len() > 20 {
                    return Err(PlatformError::Validation(
                        "at most 20 category labels are allowed".into(),
                    ));
                }
                let mut lowered: Vec<String> =
                    cleaned.iter().map(|c| c.to_lowercase()).collect();
                lowered.sort();
                lowered.dedup();
                if lowered.len() != cleaned.len() {
                    return Err(PlatformError::Validation(
                        "category labels must be unique (case-insensitive)".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn validate_language_code(code: &str) -> Result<()> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(PlatformError::Validation(format!(
            "'{code}' is not a two-letter ISO 639-1 language code"
        )))
    }
}

fn validate_supported_language(code: &str) -> Result<()> {
    validate_language_code(code)?;
    if SUPPORTED_LANGUAGES.contains(&code) {
        Ok(())
    } else {
        Err(PlatformError::Validation(format!(
            "language '{code}' is not supported (supported: {})",
            SUPPORTED_LANGUAGES.join(", ")
        )))
    }
}

/// A single inbound request: what to do, with what input, traced by an
/// optional caller-supplied correlation id. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    #[serde(flatten)]
    pub params: OperationParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl OperationRequest {
    pub fn new(params: OperationParams) -> Self {
        Self {
            params,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn operation(&self) -> Operation {
        self.params.operation()
    }

    /// Validate all fields, including the correlation id length cap.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.correlation_id {
            if id.len() > MAX_CORRELATION_ID_LEN {
                return Err(PlatformError::Validation(format!(
                    "correlation_id exceeds {MAX_CORRELATION_ID_LEN} characters"
                )));
            }
        }
        self.params.validate()
    }
}
