//! Provider router: selects the configured model provider.
//!
//! Every entry under `[providers.<name>]` speaks the Gemini
//! `generateContent` protocol; the name only selects key and base URL
//! (e.g. a regional proxy or a local emulator).

use std::collections::HashMap;
use std::sync::Arc;

use concierge_core::provider::Provider;
use tracing::debug;

use crate::gemini::{GeminiProvider, DEFAULT_BASE_URL};

/// Routes model calls to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &concierge_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        debug!(provider = %name, base_url = %base_url, "Configured provider");
        let provider = GeminiProvider::new(api_key)
            .with_name(name.clone())
            .with_base_url(base_url);
        router.register(name.clone(), Arc::new(provider));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let provider = GeminiProvider::new(api_key).with_name(config.default_provider.clone());
        router.register(config.default_provider.clone(), Arc::new(provider));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_config::{AppConfig, ProviderConfig};

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("gemini");
        router.register("gemini", Arc::new(GeminiProvider::new("key")));

        assert!(router.get("gemini").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
        assert_eq!(router.default_name(), "gemini");
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        let provider = router.default().unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn named_providers_are_registered() {
        let mut config = AppConfig {
            default_provider: "proxy".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "proxy".into(),
            ProviderConfig {
                api_key: Some("k".into()),
                api_url: Some("http://localhost:8080/v1beta".into()),
                default_model: None,
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["proxy"]);
        assert_eq!(router.default().unwrap().name(), "proxy");
    }
}
