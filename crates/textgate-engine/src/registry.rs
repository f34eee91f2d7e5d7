//! Model registry: operation → loaded model handle, with exactly-once
//! loading.
//!
//! The registry is a keyed promise cache. The first caller for a model
//! path installs a shared load future; every concurrent caller for the
//! same path awaits that same future and receives the same handle. A
//! failed load resolves all waiters with the error and is evicted, so the
//! next call may retry. Keys are canonicalized paths, not operation
//! names: two operations symlinked to one model folder share one set of
//! weights.

use crate::backend::{InferenceBackend, ModelInstance, ModelLoadError};
use crate::health::ModelStatus;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use textgate_kernel::{Operation, PlatformConfig, PlatformError, Result};

type LoadOutcome = std::result::Result<ModelHandle, ModelLoadError>;
type LoadFuture = Shared<BoxFuture<'static, LoadOutcome>>;

/// A loaded model instance.
///
/// Cheap to clone; clones share the underlying instance. Immutable after
/// creation and destroyed only on explicit unload or process shutdown.
#[derive(Clone)]
pub struct ModelHandle {
    model_id: String,
    path: PathBuf,
    loaded_at: DateTime<Utc>,
    instance: Arc<dyn ModelInstance>,
}

impl ModelHandle {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Canonicalized path the weights were loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn instance(&self) -> &dyn ModelInstance {
        self.instance.as_ref()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model_id", &self.model_id)
            .field("path", &self.path)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}

struct RegistryInner {
    config: Arc<PlatformConfig>,
    backend: Arc<dyn InferenceBackend>,
    loads: DashMap<PathBuf, LoadFuture>,
}

/// Registry of loaded models, keyed by resolved filesystem path.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct ModelRegistry {
    inner: Arc<RegistryInner>,
}

impl ModelRegistry {
    pub fn new(config: Arc<PlatformConfig>, backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                backend,
                loads: DashMap::new(),
            }),
        }
    }

    /// Static operation → (model id, configured path) lookup.
    pub fn resolve(&self, operation: Operation) -> Result<(String, PathBuf)> {
        let op_config = self
            .inner
            .config
            .operation(operation)
            .ok_or_else(|| {
                PlatformError::Configuration(format!(
                    "no model configured for operation '{operation}'"
                ))
            })?;
        Ok((
            op_config.model.clone(),
            self.inner.config.models_dir.join(&op_config.model),
        ))
    }

    /// Return the handle for an operation's model, loading it if needed.
    ///
    /// Concurrent callers for the same unloaded path coordinate so the
    /// backend sees exactly one load call; all of them resolve to the
    /// same handle, or all observe the same load error.
    pub async fn get_or_load(&self, operation: Operation) -> Result<ModelHandle> {
        let (model_id, path) = self.resolve(operation)?;
        let resolved = path.canonicalize().map_err(|e| PlatformError::ModelUnavailable {
            operation,
            reason: format!("cannot resolve model path {}: {e}", path.display()),
        })?;

        let load = match self.inner.loads.entry(resolved.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let backend = Arc::clone(&self.inner.backend);
                let id = model_id.clone();
                let load_path = resolved.clone();
                let future: LoadFuture = async move {
                    tracing::info!(model = %id, path = %load_path.display(), "loading model");
                    let instance = backend.load(&id, &load_path).await?;
                    tracing::info!(model = %id, "model registered");
                    Ok(ModelHandle {
                        model_id: id,
                        path: load_path,
                        loaded_at: Utc::now(),
                        instance,
                    })
                }
                .boxed()
                .shared();
                entry.insert(future.clone());
                future
            }
        };

        match load.clone().await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                // Failed loads are not cached. Evict only our own slot so a
                // concurrent retry's fresh future is left alone.
                self.inner
                    .loads
                    .remove_if(&resolved, |_, cached| cached.ptr_eq(&load));
                tracing::error!(operation = %operation, error = %e, "model load failed");
                Err(PlatformError::ModelUnavailable {
                    operation,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Pre-load every configured model. Any failure aborts startup:
    /// fail-fast is preferred over a silently degraded eager mode.
    pub async fn load_all(&self) -> Result<()> {
        for operation in Operation::ALL {
            if !self.inner.config.supports(operation) {
                continue;
            }
            self.get_or_load(operation).await.map_err(|e| {
                PlatformError::Configuration(format!("eager load failed: {e}"))
            })?;
        }
        Ok(())
    }

    /// Whether the model serving an operation is currently loaded.
    pub fn is_loaded(&self, operation: Operation) -> bool {
        let Ok((_, path)) = self.resolve(operation) else {
            return false;
        };
        let Ok(resolved) = path.canonicalize() else {
            return false;
        };
        self.inner
            .loads
            .get(&resolved)
            .is_some_and(|load| matches!(load.peek(), Some(Ok(_))))
    }

    /// Drop the loaded model behind an operation. Returns whether a
    /// loaded instance was actually removed. In-flight inference calls
    /// holding a handle keep the instance alive until they finish.
    pub fn unload(&self, operation: Operation) -> bool {
        let Ok((_, path)) = self.resolve(operation) else {
            return false;
        };
        let Ok(resolved) = path.canonicalize() else {
            return false;
        };
        match self.inner.loads.remove(&resolved) {
            Some((_, load)) => {
                let was_ready = matches!(load.peek(), Some(Ok(_)));
                if was_ready {
                    tracing::info!(operation = %operation, "model unloaded");
                }
                was_ready
            }
            None => false,
        }
    }

    /// Per-operation model status, for the health surface.
    pub fn statuses(&self) -> Vec<ModelStatus> {
        let mut statuses = Vec::new();
        for operation in Operation::ALL {
            if let Ok((model_id, path)) = self.resolve(operation) {
                statuses.push(ModelStatus {
                    operation,
                    model_id,
                    path,
                    loaded: self.is_loaded(operation),
                });
            }
        }
        statuses
    }
}
