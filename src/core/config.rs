//! Manages the loading of vault settings and LLM provider configurations.

use llm::builder::LLMBackend;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::core::sync::DEFAULT_DEBOUNCE_MS;

#[derive(Deserialize, Debug, Default)]
struct ConfigFile {
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
    default_provider: Option<String>,
    #[serde(default)]
    sync: SyncSettings,
}

#[derive(Deserialize, Debug)]
struct ProviderConfig {
    backend: String,
    model: String,
    api_key_env: Option<String>,
    base_url: Option<String>,
}

/// Write-coalescing knobs from the `[sync]` table.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SyncSettings {
    pub debounce_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// One configured LLM provider. The API key stays an environment variable
/// name here; it is only resolved when a run actually builds the backend.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub backend: LLMBackend,
    pub model: String,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderSpec {
    /// Read the configured API key from the environment. Backends without
    /// a conventional key variable (Ollama and friends) resolve to `None`.
    pub fn resolve_api_key(&self, provider_name: &str) -> Result<Option<String>, String> {
        let env_var = match &self.api_key_env {
            Some(var) => var.clone(),
            None => match self.backend {
                LLMBackend::OpenAI => "OPENAI_API_KEY".to_string(),
                LLMBackend::Anthropic => "ANTHROPIC_API_KEY".to_string(),
                _ => String::new(),
            },
        };
        if env_var.is_empty() {
            return Ok(None);
        }
        std::env::var(&env_var).map(Some).map_err(|_| {
            format!(
                "Environment variable '{}' not set for provider '{}'",
                env_var, provider_name
            )
        })
    }
}

/// Named provider specs from `config.toml`.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderSpec>,
    default_provider: Option<String>,
}

impl ProviderRegistry {
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ProviderSpec> {
        self.providers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Pick a provider: an explicit name, otherwise the configured default,
    /// otherwise the sole entry.
    pub fn resolve(&self, name: Option<&str>) -> Result<(&str, &ProviderSpec), String> {
        if let Some(name) = name {
            return self
                .providers
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| format!("Provider '{}' not found in config.toml", name));
        }
        if let Some(default) = &self.default_provider {
            return self
                .providers
                .get_key_value(default)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| {
                    format!("default_provider '{}' not found in config.toml", default)
                });
        }
        if self.providers.len() == 1 {
            if let Some((k, v)) = self.providers.iter().next() {
                return Ok((k.as_str(), v));
            }
        }
        if self.providers.is_empty() {
            Err("No providers configured. Add a [providers.<name>] table to config.toml or pass --backend".to_string())
        } else {
            Err(format!(
                "Multiple providers configured ({}). Pass --provider or set default_provider",
                self.names().join(", ")
            ))
        }
    }
}

/// Everything `config.toml` can say about a vault.
#[derive(Debug, Default)]
pub struct VaultConfig {
    pub providers: ProviderRegistry,
    pub sync: SyncSettings,
}

impl VaultConfig {
    /// Load from `config.toml`. A missing file yields the defaults and an
    /// empty registry; commands warn the user when they need a provider.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config.toml: {}", e))?;
        let config: ConfigFile =
            toml::from_str(&contents).map_err(|e| format!("Failed to parse config.toml: {}", e))?;

        let mut providers = HashMap::new();
        for (name, provider_conf) in config.providers {
            let backend = LLMBackend::from_str(&provider_conf.backend).map_err(|_| {
                format!(
                    "Invalid backend '{}' for provider '{}'",
                    provider_conf.backend, name
                )
            })?;
            providers.insert(
                name,
                ProviderSpec {
                    backend,
                    model: provider_conf.model,
                    api_key_env: provider_conf.api_key_env,
                    base_url: provider_conf.base_url,
                },
            );
        }

        Ok(Self {
            providers: ProviderRegistry {
                providers,
                default_provider: config.default_provider,
            },
            sync: config.sync,
        })
    }
}
