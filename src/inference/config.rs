//! Provider configuration types and seed-file loading.
//!
//! Provider configs are persisted in the coach database and read whole on
//! every router reload. On first start, `providers.yaml` may seed the table.
//! The seed file supports `${VAR}` and `${VAR:-default}` interpolation so
//! credentials can come from the environment.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::InferenceError;

/// Environment variable that points at an explicit seed file.
pub const PROVIDERS_ENV: &str = "GOALCOACH_PROVIDERS";

const SEED_FILE_NAME: &str = "providers.yaml";

// ─── Provider Kinds ──────────────────────────────────────────────────────────

/// Provider kinds this build can instantiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenRouter,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenRouter, ProviderKind::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Parse a stored kind string. Unknown kinds yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Some(ProviderKind::OpenRouter),
            "ollama" => Some(ProviderKind::Ollama),
            _ => None,
        }
    }

    /// Base URL used when a config leaves `base_url` empty.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Ollama => "http://localhost:11434/v1",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Provider Configs ────────────────────────────────────────────────────────

/// A persisted provider configuration.
///
/// `provider` stays a raw string so configs naming kinds this build does not
/// know can still be stored, listed and edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    pub name: String,
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderConfig {
    pub fn kind(&self) -> Option<ProviderKind> {
        ProviderKind::parse(&self.provider)
    }

    /// The configured base URL, or the kind's default when empty.
    pub fn effective_base_url(&self) -> Option<String> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
        self.kind().map(|k| k.default_base_url().to_string())
    }
}

/// Fields for a provider configuration that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProviderConfig {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub default_model: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl NewProviderConfig {
    pub fn validate(&self) -> Result<(), InferenceError> {
        validate_fields(&self.name, &self.default_model)
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), InferenceError> {
        validate_fields(&self.name, &self.default_model)
    }
}

fn validate_fields(name: &str, default_model: &str) -> Result<(), InferenceError> {
    if name.trim().is_empty() {
        return Err(InferenceError::ConfigError {
            reason: "provider name must not be empty".into(),
        });
    }
    if default_model.trim().is_empty() {
        return Err(InferenceError::ConfigError {
            reason: format!("provider '{name}' has no default model"),
        });
    }
    Ok(())
}

// ─── Seed File ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProviderSeedFile {
    #[serde(default)]
    providers: Vec<NewProviderConfig>,
}

/// Locate the provider seed file.
///
/// `GOALCOACH_PROVIDERS` wins when it points at an existing file; otherwise
/// `providers.yaml` inside `data_dir` is used if present.
pub fn find_seed_path(data_dir: &Path) -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(PROVIDERS_ENV) {
        let candidate = PathBuf::from(expand_home(&explicit));
        if candidate.exists() {
            return Some(candidate);
        }
        tracing::warn!(path = %candidate.display(), "provider seed file from env does not exist");
    }

    let candidate = data_dir.join(SEED_FILE_NAME);
    candidate.exists().then_some(candidate)
}

/// Load and validate the provider seed file.
pub fn load_provider_seed(path: &Path) -> Result<Vec<NewProviderConfig>, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_provider_seed(&raw)
}

fn parse_provider_seed(raw: &str) -> Result<Vec<NewProviderConfig>, InferenceError> {
    let interpolated = interpolate_env_vars(raw);

    let file: ProviderSeedFile =
        serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
            reason: format!("failed to parse provider seed: {e}"),
        })?;

    for config in &file.providers {
        config.validate()?;
    }
    Ok(file.providers)
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Expand `${NAME}` and `${NAME:-fallback}` in seed text so API keys can stay
/// in the environment. An unterminated `${` is kept as written.
fn interpolate_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let expr_and_tail = &rest[start + 2..];
        let Some(end) = expr_and_tail.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        out.push_str(&lookup_var(&expr_and_tail[..end]));
        rest = &expr_and_tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Unset or empty variables take the fallback, or become empty without one.
fn lookup_var(expr: &str) -> String {
    let (name, fallback) = match expr.split_once(":-") {
        Some((name, fallback)) => (name, Some(fallback)),
        None => (expr, None),
    };
    match std::env::var(name.trim()) {
        Ok(value) if !value.is_empty() => value,
        _ => fallback.map(expand_home).unwrap_or_default(),
    }
}

/// `~` or `~/...` relative to the home directory; other paths are unchanged.
fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{rest}", home.display()),
        None => path.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
