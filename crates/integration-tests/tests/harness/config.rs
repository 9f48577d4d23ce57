//! Programmatic configuration builder for integration tests

use indexmap::IndexMap;
use relay_config::{ChatMode, Config, ModelOverride, ProviderName, ProviderSettings, ToolConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Empty configuration without env credential fallback
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Point a provider at a mock server
    pub fn with_provider(mut self, provider: ProviderName, endpoint: &str) -> Self {
        self.config.providers.insert(
            provider,
            ProviderSettings {
                api_key: Some(SecretString::from("test-key")),
                endpoint: Some(endpoint.parse().expect("valid URL")),
                ..ProviderSettings::default()
            },
        );
        self
    }

    /// Add a model override to an already configured provider
    pub fn with_model(mut self, provider: ProviderName, model: &str, overrides: ModelOverride) -> Self {
        self.config
            .providers
            .get_mut(&provider)
            .expect("provider configured first")
            .models
            .insert(model.to_owned(), overrides);
        self
    }

    /// Add a tool enabled in gather and agent modes
    pub fn with_tool(mut self, name: &str, params: &[(&str, &str)]) -> Self {
        self.config.tools.push(ToolConfig {
            name: name.to_owned(),
            description: format!("The {name} tool"),
            modes: vec![ChatMode::Gather, ChatMode::Agent],
            params: params
                .iter()
                .map(|(param, description)| ((*param).to_owned(), (*description).to_owned()))
                .collect::<IndexMap<_, _>>(),
        });
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
