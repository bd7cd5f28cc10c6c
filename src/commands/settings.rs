//! Provider and application settings commands.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::agent_core::OrchestratorLimits;
use crate::inference::{NewProviderConfig, ProviderConfig, ProviderKind};
use crate::AppState;

/// File name of the persisted app settings inside the data directory.
pub const SETTINGS_FILE: &str = "app_settings.json";

/// Upper bound accepted for `max_tool_iterations`.
const MAX_TOOL_ITERATIONS_LIMIT: usize = 10;

// ─── App Settings ───────────────────────────────────────────────────────────

/// Runtime tunables for the coaching pipeline.
///
/// Persisted to `app_settings.json` in the app data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Conversation turns loaded into each session context.
    pub history_window: usize,
    /// Model round trips allowed per agent turn.
    pub max_tool_iterations: usize,
    /// Recent turns summarized for the intent classifier.
    pub classifier_history: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        let limits = OrchestratorLimits::default();
        Self {
            history_window: limits.history_window,
            max_tool_iterations: limits.max_tool_iterations,
            classifier_history: limits.classifier_history,
        }
    }
}

impl AppSettings {
    pub fn limits(&self) -> OrchestratorLimits {
        OrchestratorLimits {
            history_window: self.history_window,
            max_tool_iterations: self.max_tool_iterations,
            classifier_history: self.classifier_history,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.history_window == 0 {
            return Err("history_window must be at least 1".into());
        }
        if !(1..=MAX_TOOL_ITERATIONS_LIMIT).contains(&self.max_tool_iterations) {
            return Err(format!(
                "max_tool_iterations must be between 1 and {MAX_TOOL_ITERATIONS_LIMIT}"
            ));
        }
        Ok(())
    }

    /// Load from `path` or return defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(cfg) if cfg.validate().is_ok() => {
                    tracing::info!(path = %path.display(), "loaded app settings");
                    cfg
                }
                Ok(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        "app settings out of range, using defaults"
                    );
                    Self::default()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse app settings, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to read app settings, using defaults");
                Self::default()
            }
        }
    }

    /// Save to `path` (atomic write).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;
        std::fs::rename(&tmp_path, path)?;
        tracing::debug!(path = %path.display(), "saved app settings");
        Ok(())
    }
}

pub fn get_app_settings(state: &AppState) -> Result<AppSettings, String> {
    Ok(state.settings())
}

/// Validate, persist, and apply new settings.
pub fn update_app_settings(state: &AppState, settings: AppSettings) -> Result<AppSettings, String> {
    settings.validate()?;
    state.apply_settings(settings).map_err(|e| e.to_string())?;
    tracing::info!(
        history_window = settings.history_window,
        max_tool_iterations = settings.max_tool_iterations,
        classifier_history = settings.classifier_history,
        "app settings updated"
    );
    Ok(settings)
}

pub fn reset_app_settings(state: &AppState) -> Result<AppSettings, String> {
    let defaults = AppSettings::default();
    state.apply_settings(defaults).map_err(|e| e.to_string())?;
    tracing::info!("app settings reset to defaults");
    Ok(defaults)
}

// ─── Provider Configs ───────────────────────────────────────────────────────

pub fn list_provider_kinds(state: &AppState) -> Result<Vec<ProviderKind>, String> {
    Ok(state.router.available_provider_kinds())
}

pub fn list_provider_configs(state: &AppState) -> Result<Vec<ProviderConfig>, String> {
    state.router.list_configs().map_err(|e| e.to_string())
}

pub fn save_provider_config(
    state: &AppState,
    config: NewProviderConfig,
) -> Result<ProviderConfig, String> {
    if ProviderKind::parse(&config.provider).is_none() {
        tracing::warn!(
            provider = %config.name,
            kind = %config.provider,
            "saving config with unsupported kind"
        );
    }
    state.router.save_config(config).map_err(|e| e.to_string())
}

pub fn update_provider_config(
    state: &AppState,
    config: ProviderConfig,
) -> Result<ProviderConfig, String> {
    state.router.update_config(&config).map_err(|e| e.to_string())?;
    Ok(config)
}

pub fn delete_provider_config(state: &AppState, id: i64) -> Result<(), String> {
    state.router.delete_config(id).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openrouter(name: &str, is_default: bool) -> NewProviderConfig {
        NewProviderConfig {
            name: name.into(),
            provider: "openrouter".into(),
            base_url: String::new(),
            api_key: "sk-test".into(),
            default_model: "openai/gpt-4o-mini".into(),
            is_default,
            is_active: true,
        }
    }

    #[test]
    fn test_settings_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        assert_eq!(AppSettings::load_or_default(&path), AppSettings::default());

        let custom = AppSettings {
            history_window: 20,
            max_tool_iterations: 4,
            classifier_history: 3,
        };
        custom.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(AppSettings::load_or_default(&path), custom);
    }

    #[test]
    fn test_settings_partial_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        std::fs::write(&path, r#"{"history_window": 4}"#).unwrap();
        let loaded = AppSettings::load_or_default(&path);
        assert_eq!(loaded.history_window, 4);
        assert_eq!(loaded.max_tool_iterations, 3);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(AppSettings::load_or_default(&path), AppSettings::default());

        std::fs::write(&path, r#"{"max_tool_iterations": 0}"#).unwrap();
        assert_eq!(AppSettings::load_or_default(&path), AppSettings::default());
    }

    #[test]
    fn test_settings_validation() {
        assert!(AppSettings::default().validate().is_ok());
        let zero_window = AppSettings {
            history_window: 0,
            ..Default::default()
        };
        assert!(zero_window.validate().is_err());
        let too_many = AppSettings {
            max_tool_iterations: 11,
            ..Default::default()
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_update_and_reset_app_settings() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(":memory:", dir.path()).unwrap();

        let updated = update_app_settings(
            &state,
            AppSettings {
                history_window: 6,
                max_tool_iterations: 2,
                classifier_history: 2,
            },
        )
        .unwrap();
        assert_eq!(get_app_settings(&state).unwrap(), updated);
        assert_eq!(
            AppSettings::load_or_default(&dir.path().join(SETTINGS_FILE)),
            updated
        );

        let err = update_app_settings(
            &state,
            AppSettings {
                max_tool_iterations: 0,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("max_tool_iterations"));
        assert_eq!(get_app_settings(&state).unwrap(), updated);

        assert_eq!(reset_app_settings(&state).unwrap(), AppSettings::default());
        assert_eq!(get_app_settings(&state).unwrap(), AppSettings::default());
    }

    #[test]
    fn test_provider_config_commands() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(":memory:", dir.path()).unwrap();

        assert_eq!(
            list_provider_kinds(&state).unwrap(),
            vec![ProviderKind::OpenRouter, ProviderKind::Ollama]
        );

        let saved = save_provider_config(&state, openrouter("cloud", true)).unwrap();
        let configs = list_provider_configs(&state).unwrap();
        assert_eq!(configs[0].name, "cloud");
        assert!(configs[0].is_default);
        assert_eq!(state.router.snapshot().default.as_deref(), Some("cloud"));

        let mut renamed = saved.clone();
        renamed.default_model = "anthropic/claude-3.5-haiku".into();
        update_provider_config(&state, renamed).unwrap();
        let stored = list_provider_configs(&state)
            .unwrap()
            .into_iter()
            .find(|c| c.id == saved.id)
            .unwrap();
        assert_eq!(stored.default_model, "anthropic/claude-3.5-haiku");

        let err = save_provider_config(&state, openrouter("", false)).unwrap_err();
        assert!(err.contains("name"));

        delete_provider_config(&state, saved.id).unwrap();
        assert!(list_provider_configs(&state)
            .unwrap()
            .iter()
            .all(|c| c.id != saved.id));
        assert!(delete_provider_config(&state, saved.id).is_err());
    }
}
