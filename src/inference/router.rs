//! Provider router: the registry of live model backends.
//!
//! The registry is rebuilt wholesale from the persisted provider configs on
//! every config mutation. A reload builds the new registry off to the side and
//! then swaps it in under the write lock, so concurrent `resolve`/`complete`
//! calls see either the complete old registry or the complete new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::backend::ModelBackend;
use super::client::OpenAiCompatibleBackend;
use super::config::{NewProviderConfig, ProviderConfig, ProviderKind};
use super::errors::InferenceError;
use super::types::{CompletionRequest, CompletionResponse};

// ─── Store Seam ──────────────────────────────────────────────────────────────

/// Persistence for provider configs.
pub trait ProviderConfigStore: Send + Sync {
    /// All configs, defaults first.
    fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>, InferenceError>;

    fn insert_provider_config(
        &self,
        config: &NewProviderConfig,
    ) -> Result<ProviderConfig, InferenceError>;

    fn update_provider_config(&self, config: &ProviderConfig) -> Result<(), InferenceError>;

    fn delete_provider_config(&self, id: i64) -> Result<(), InferenceError>;
}

/// Builds a live backend from a stored config.
pub type BackendFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn ModelBackend>, InferenceError> + Send + Sync>;

fn http_backend_factory() -> BackendFactory {
    Arc::new(|config: &ProviderConfig| {
        let backend = OpenAiCompatibleBackend::from_config(config)?;
        Ok(Arc::new(backend) as Arc<dyn ModelBackend>)
    })
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
    backends: HashMap<String, Arc<dyn ModelBackend>>,
    default: Option<Arc<dyn ModelBackend>>,
}

/// A consistent view of the registry taken under one read lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Backend names, sorted.
    pub providers: Vec<String>,
    pub default: Option<String>,
}

// ─── ProviderRouter ──────────────────────────────────────────────────────────

/// Resolves which model backend serves a request.
pub struct ProviderRouter {
    store: Arc<dyn ProviderConfigStore>,
    factory: BackendFactory,
    registry: RwLock<Registry>,
    /// Serializes reloads so an older rebuild can never overwrite a newer one.
    reload_gate: Mutex<()>,
}

impl ProviderRouter {
    /// Create a router that talks HTTP to the configured providers.
    pub fn new(store: Arc<dyn ProviderConfigStore>) -> Result<Self, InferenceError> {
        Self::with_factory(store, http_backend_factory())
    }

    /// Create a router with a custom backend factory, then load the registry.
    pub fn with_factory(
        store: Arc<dyn ProviderConfigStore>,
        factory: BackendFactory,
    ) -> Result<Self, InferenceError> {
        let router = Self {
            store,
            factory,
            registry: RwLock::new(Registry::default()),
            reload_gate: Mutex::new(()),
        };
        router.reload()?;
        Ok(router)
    }

    // ─── Resolution ──────────────────────────────────────────────────────

    /// Return the first preferred backend that is available, else the default.
    pub fn resolve(&self, preferred: &[&str]) -> Option<Arc<dyn ModelBackend>> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        for name in preferred {
            if let Some(backend) = registry.backends.get(*name) {
                if backend.is_available() {
                    return Some(Arc::clone(backend));
                }
            }
        }
        registry.default.clone()
    }

    /// Resolve a backend and forward the request to it.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        preferred: &[&str],
    ) -> Result<CompletionResponse, InferenceError> {
        let backend = self
            .resolve(preferred)
            .ok_or_else(|| InferenceError::NoProviderAvailable {
                requested: preferred.iter().map(|s| s.to_string()).collect(),
            })?;

        tracing::debug!(provider = %backend.name(), kind = %backend.kind(), "routing completion");
        backend.complete(request).await
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let mut providers: Vec<String> = registry
            .backends
            .values()
            .map(|b| b.name().to_string())
            .collect();
        providers.sort();
        RegistrySnapshot {
            providers,
            default: registry.default.as_ref().map(|b| b.name().to_string()),
        }
    }

    // ─── Reload ──────────────────────────────────────────────────────────

    /// Rebuild the registry from every persisted config.
    ///
    /// Only active configs are instantiated. The first active config flagged
    /// default becomes the default. Configs whose backend cannot be built are
    /// logged and skipped.
    pub fn reload(&self) -> Result<(), InferenceError> {
        let _gate = self.reload_gate.lock().unwrap_or_else(PoisonError::into_inner);

        let configs = self.store.list_provider_configs()?;
        let mut next = Registry::default();

        for config in configs.iter().filter(|c| c.is_active) {
            let backend = match (self.factory)(config) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(
                        provider = %config.name,
                        kind = %config.provider,
                        error = %e,
                        "skipping provider config"
                    );
                    continue;
                }
            };

            if config.is_default && next.default.is_none() {
                next.default = Some(Arc::clone(&backend));
            }
            if next.backends.insert(config.name.clone(), backend).is_some() {
                tracing::warn!(
                    provider = %config.name,
                    "duplicate provider name, later config wins"
                );
            }
        }

        let loaded = next.backends.len();
        let default_name = next.default.as_ref().map(|b| b.name().to_string());

        {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            *registry = next;
        }

        tracing::info!(
            configs = configs.len(),
            loaded,
            default = default_name.as_deref().unwrap_or("none"),
            "provider registry reloaded"
        );
        Ok(())
    }

    // ─── Config CRUD ─────────────────────────────────────────────────────

    /// Persist a new provider config, then reload.
    pub fn save_config(&self, config: NewProviderConfig) -> Result<ProviderConfig, InferenceError> {
        config.validate()?;
        let saved = self.store.insert_provider_config(&config)?;
        tracing::info!(id = saved.id, provider = %saved.name, "provider config saved");
        self.reload()?;
        Ok(saved)
    }

    pub fn update_config(&self, config: &ProviderConfig) -> Result<(), InferenceError> {
        config.validate()?;
        self.store.update_provider_config(config)?;
        tracing::info!(id = config.id, provider = %config.name, "provider config updated");
        self.reload()
    }

    pub fn delete_config(&self, id: i64) -> Result<(), InferenceError> {
        self.store.delete_provider_config(id)?;
        tracing::info!(id, "provider config deleted");
        self.reload()
    }

    pub fn list_configs(&self) -> Result<Vec<ProviderConfig>, InferenceError> {
        self.store.list_provider_configs()
    }

    /// Provider kinds a config may name.
    pub fn available_provider_kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL.to_vec()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
