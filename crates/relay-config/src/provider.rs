use std::collections::HashMap;

use secrecy::SecretString;
use serde::Deserialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use url::Url;

/// Identifier of every backend the adapter can talk to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum ProviderName {
    #[serde(rename = "anthropic")]
    #[strum(serialize = "anthropic")]
    Anthropic,
    #[serde(rename = "openAI")]
    #[strum(serialize = "openAI")]
    OpenAi,
    #[serde(rename = "deepseek")]
    #[strum(serialize = "deepseek")]
    Deepseek,
    #[serde(rename = "openRouter")]
    #[strum(serialize = "openRouter")]
    OpenRouter,
    #[serde(rename = "gemini")]
    #[strum(serialize = "gemini")]
    Gemini,
    #[serde(rename = "groq")]
    #[strum(serialize = "groq")]
    Groq,
    #[serde(rename = "xAI")]
    #[strum(serialize = "xAI")]
    XAi,
    #[serde(rename = "mistral")]
    #[strum(serialize = "mistral")]
    Mistral,
    #[serde(rename = "ollama")]
    #[strum(serialize = "ollama")]
    Ollama,
    #[serde(rename = "vLLM")]
    #[strum(serialize = "vLLM")]
    VLlm,
    #[serde(rename = "lmStudio")]
    #[strum(serialize = "lmStudio")]
    LmStudio,
    #[serde(rename = "liteLLM")]
    #[strum(serialize = "liteLLM")]
    LiteLlm,
    #[serde(rename = "openAICompatible")]
    #[strum(serialize = "openAICompatible")]
    OpenAiCompatible,
    #[serde(rename = "googleVertex")]
    #[strum(serialize = "googleVertex")]
    GoogleVertex,
    #[serde(rename = "microsoftAzure")]
    #[strum(serialize = "microsoftAzure")]
    MicrosoftAzure,
    #[serde(rename = "awsBedrock")]
    #[strum(serialize = "awsBedrock")]
    AwsBedrock,
    /// Remote task-decomposition service
    #[serde(rename = "division")]
    #[strum(serialize = "division")]
    Division,
}

impl ProviderName {
    /// Human-facing name, used in credential errors
    pub const fn title(self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAi => "OpenAI",
            Self::Deepseek => "DeepSeek",
            Self::OpenRouter => "OpenRouter",
            Self::Gemini => "Gemini",
            Self::Groq => "Groq",
            Self::XAi => "Grok (xAI)",
            Self::Mistral => "Mistral",
            Self::Ollama => "Ollama",
            Self::VLlm => "vLLM",
            Self::LmStudio => "LM Studio",
            Self::LiteLlm => "LiteLLM",
            Self::OpenAiCompatible => "OpenAI-Compatible",
            Self::GoogleVertex => "Google Vertex AI",
            Self::MicrosoftAzure => "Microsoft Azure OpenAI",
            Self::AwsBedrock => "AWS Bedrock",
            Self::Division => "Division",
        }
    }

    /// Base URL used when the settings carry no endpoint
    ///
    /// `None` means the provider cannot be reached without an explicit endpoint.
    pub const fn default_endpoint(self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("https://api.anthropic.com/v1"),
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Deepseek => Some("https://api.deepseek.com/v1"),
            Self::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
            Self::XAi => Some("https://api.x.ai/v1"),
            Self::Mistral => Some("https://api.mistral.ai/v1"),
            Self::Ollama => Some("http://127.0.0.1:11434"),
            Self::VLlm => Some("http://localhost:8000"),
            Self::LmStudio => Some("http://localhost:1234"),
            Self::LiteLlm
            | Self::OpenAiCompatible
            | Self::GoogleVertex
            | Self::MicrosoftAzure
            | Self::AwsBedrock
            | Self::Division => None,
        }
    }

    /// Environment variable consulted for the API key when env fallback is allowed
    pub const fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Deepseek => Some("DEEPSEEK_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::XAi => Some("XAI_API_KEY"),
            Self::Mistral => Some("MISTRAL_API_KEY"),
            Self::OpenAiCompatible => Some("OPENAI_COMPATIBLE_API_KEY"),
            Self::MicrosoftAzure => Some("AZURE_OPENAI_API_KEY"),
            Self::AwsBedrock => Some("AWS_BEDROCK_API_KEY"),
            Self::Division => Some("DIVISION_API_KEY"),
            Self::Ollama | Self::VLlm | Self::LmStudio | Self::LiteLlm | Self::GoogleVertex => None,
        }
    }

    /// Whether the provider runs locally and accepts any placeholder key
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Ollama | Self::VLlm | Self::LmStudio | Self::LiteLlm)
    }
}

/// Stored settings for a single provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Endpoint override
    #[serde(default)]
    pub endpoint: Option<Url>,
    /// Extra request headers as a JSON object string (`openAICompatible`)
    #[serde(default)]
    pub headers_json: Option<String>,
    /// Google Cloud project (`googleVertex`)
    #[serde(default)]
    pub project: Option<String>,
    /// Google Cloud region (`googleVertex`)
    #[serde(default)]
    pub region: Option<String>,
    /// API version query parameter (`microsoftAzure`)
    #[serde(default)]
    pub api_version: Option<String>,
    /// Model used when a request names none
    #[serde(default)]
    pub default_model: Option<String>,
    /// Per-model capability overrides
    #[serde(default)]
    pub models: HashMap<String, ModelOverride>,
}

/// Per-model capability overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOverride {
    /// Name sent to the provider instead of the requested one
    #[serde(default)]
    pub resolved_name: Option<String>,
    /// Whether the model accepts fill-in-middle requests
    #[serde(default)]
    pub supports_fim: Option<bool>,
    /// Whether the model supports the provider's native tool calling
    #[serde(default)]
    pub native_tools: Option<bool>,
    /// Delta field carrying reasoning text (e.g. `reasoning_content`)
    #[serde(default)]
    pub reasoning_field: Option<String>,
    /// Open and close delimiters of inline reasoning
    #[serde(default)]
    pub think_tags: Option<[String; 2]>,
    /// Output tokens reserved for the answer
    #[serde(default)]
    pub reserved_output_tokens: Option<u32>,
    /// Extra top-level fields for chat request bodies
    ///
    /// Fields the request already sets take precedence over these.
    #[serde(default)]
    pub extra_payload: serde_json::Map<String, serde_json::Value>,
}
