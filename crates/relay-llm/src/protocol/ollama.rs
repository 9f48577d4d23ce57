//! Ollama native API wire format types

use serde::{Deserialize, Serialize};

/// `/api/generate` request used for fill-in-middle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaGenerateRequest {
    /// Model identifier
    pub model: String,
    /// Text before the cursor
    pub prompt: String,
    /// Text after the cursor
    pub suffix: String,
    /// Always true
    pub stream: bool,
    /// Sampling options
    pub options: OllamaOptions,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Completion length cap
    pub num_predict: u32,
}

/// One NDJSON line of a streamed `/api/generate` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaGenerateChunk {
    /// Text fragment
    #[serde(default)]
    pub response: String,
    /// Set on the last line
    #[serde(default)]
    pub done: bool,
    /// In-stream failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `/api/tags` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaTagList {
    /// Locally installed models
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

/// Installed model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaTag {
    /// Model name with tag (e.g. `llama3.1:8b`)
    pub name: String,
    /// Model details
    #[serde(default)]
    pub details: Option<OllamaTagDetails>,
}

/// Model details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaTagDetails {
    /// Model family (e.g. `llama`)
    #[serde(default)]
    pub family: Option<String>,
}
