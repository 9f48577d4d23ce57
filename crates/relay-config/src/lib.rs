//! Configuration for the relay adapter
//!
//! Provider settings, per-model capability overrides and the tool catalog are
//! read from a single TOML file.

#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod provider;
pub mod tools;

use indexmap::IndexMap;
use serde::Deserialize;

pub use loader::parse_headers_json;
pub use provider::*;
pub use tools::*;

/// Top-level relay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Whether credentials may fall back to environment variables
    ///
    /// Mirrors the host's login state: only a signed-in user gets env fallback.
    #[serde(default)]
    pub allow_env_credentials: bool,
    /// Provider settings keyed by provider identifier
    #[serde(default)]
    pub providers: IndexMap<ProviderName, ProviderSettings>,
    /// Tool catalog
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
}

impl Config {
    /// Settings for a provider, if configured
    pub fn provider(&self, name: ProviderName) -> Option<&ProviderSettings> {
        self.providers.get(&name)
    }
}
