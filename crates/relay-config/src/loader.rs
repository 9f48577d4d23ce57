use std::collections::HashSet;
use std::path::Path;

use crate::{Config, ProviderName};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, placeholder expansion
    /// fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error on malformed header JSON, empty reasoning delimiters or
    /// duplicate tool names
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;
        self.validate_tools()?;
        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        for (name, settings) in &self.providers {
            if let Some(raw) = &settings.headers_json {
                parse_headers_json(raw)
                    .map_err(|e| anyhow::anyhow!("invalid headers_json for provider '{name}': {e}"))?;
            }

            for (model, overrides) in &settings.models {
                if let Some([open, close]) = &overrides.think_tags
                    && (open.is_empty() || close.is_empty())
                {
                    anyhow::bail!("think_tags for model '{model}' of provider '{name}' must both be non-empty");
                }
            }

            if *name == ProviderName::GoogleVertex && (settings.project.is_none() || settings.region.is_none()) {
                tracing::warn!(provider = %name, "googleVertex needs both project and region before it can be used");
            }
        }

        Ok(())
    }

    fn validate_tools(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();

        for tool in &self.tools {
            if tool.name.is_empty() {
                anyhow::bail!("tool names must not be empty");
            }
            if !seen.insert(tool.name.as_str()) {
                anyhow::bail!("tool '{}' is declared more than once", tool.name);
            }
        }

        Ok(())
    }
}

/// Parse a JSON object of header name to string value
///
/// # Errors
///
/// Returns an error if the text is not a JSON object whose values are all strings
pub fn parse_headers_json(raw: &str) -> anyhow::Result<Vec<(String, String)>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let serde_json::Value::Object(map) = value else {
        anyhow::bail!("expected a JSON object");
    };

    map.into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => Ok((key, s)),
            other => Err(anyhow::anyhow!("header '{key}' must be a string, got {other}")),
        })
        .collect()
}
