//! Static facts about providers and models

use relay_config::{ModelOverride, ProviderName};

/// Native tool-calling dialect of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallStyle {
    /// `tools` / `tool_calls` on the chat-completions wire
    OpenAi,
    /// `tool_use` content blocks
    Anthropic,
    /// `functionDeclarations` / `functionCall` parts
    Gemini,
}

/// Open and close delimiters of inline reasoning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkTags {
    pub open: String,
    pub close: String,
}

impl Default for ThinkTags {
    fn default() -> Self {
        Self {
            open: "<think>".to_owned(),
            close: "</think>".to_owned(),
        }
    }
}

/// What a model can do with reasoning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningCapabilities {
    /// Whether reasoning can be requested at all
    pub can_reason: bool,
    /// Delimiters when reasoning arrives inline in the text channel
    pub think_tags: Option<ThinkTags>,
    /// Delta field carrying reasoning, overriding the provider default
    pub reasoning_field: Option<String>,
}

/// Resolved facts about one model on one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCapabilities {
    /// Name to send upstream
    pub resolved_model_name: String,
    /// Whether fill-in-middle requests are accepted
    pub supports_fim: bool,
    /// Native tool dialect, `None` when tools must go through XML text
    pub native_tool_style: Option<ToolCallStyle>,
    pub reasoning: ReasoningCapabilities,
    /// Extra top-level fields merged into the request body
    pub extra_payload: serde_json::Map<String, serde_json::Value>,
}

/// How a provider expects reasoning to be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningInput {
    /// No reasoning controls
    None,
    /// `thinking: {type: "enabled", budget_tokens}`
    AnthropicThinking,
    /// `reasoning_effort: "low" | "medium" | "high"`
    OpenAiEffort,
    /// `reasoning: {max_tokens}` or `reasoning: {effort}`
    OpenRouterReasoning,
    /// `generationConfig.thinkingConfig`
    GeminiThinkingConfig,
}

/// Provider-wide reasoning I/O settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub reasoning_input: ReasoningInput,
    /// Delta field carrying reasoning on the chat-completions wire
    pub reasoning_field: Option<String>,
}

/// Source of provider and model facts
pub trait CapabilityResolver: Send + Sync {
    /// Facts for `model` on `provider`, with configured overrides applied
    fn model_capabilities(
        &self,
        provider: ProviderName,
        model: &str,
        overrides: Option<&ModelOverride>,
    ) -> ModelCapabilities;

    /// Provider-wide settings
    fn provider_capabilities(&self, provider: ProviderName) -> ProviderCapabilities;

    /// Output tokens reserved for the answer, if the provider needs an explicit limit
    fn reserved_output_tokens(
        &self,
        provider: ProviderName,
        model: &str,
        overrides: Option<&ModelOverride>,
    ) -> Option<u32>;
}

/// Output tokens Anthropic reserves when nothing else is configured
pub const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 8192;

const FIM_MODEL_MARKERS: &[&str] = &[
    "codestral",
    "qwen2.5-coder",
    "deepseek-coder",
    "starcoder",
    "codegemma",
    "codellama",
];

const INLINE_REASONING_MARKERS: &[&str] = &["deepseek-r1", "qwq", "qwen3"];

/// Conservative built-in resolver driven by model-name heuristics
///
/// Configured [`ModelOverride`] values always win over the heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCapabilities;

impl StaticCapabilities {
    const fn default_tool_style(provider: ProviderName) -> Option<ToolCallStyle> {
        match provider {
            ProviderName::Anthropic => Some(ToolCallStyle::Anthropic),
            ProviderName::Gemini => Some(ToolCallStyle::Gemini),
            ProviderName::Ollama
            | ProviderName::VLlm
            | ProviderName::LmStudio
            | ProviderName::LiteLlm
            | ProviderName::Division => None,
            _ => Some(ToolCallStyle::OpenAi),
        }
    }

    /// Dialect used when an override forces native tools on
    const fn forced_tool_style(provider: ProviderName) -> Option<ToolCallStyle> {
        match provider {
            ProviderName::Division => None,
            ProviderName::Anthropic => Some(ToolCallStyle::Anthropic),
            ProviderName::Gemini => Some(ToolCallStyle::Gemini),
            _ => Some(ToolCallStyle::OpenAi),
        }
    }
}

impl CapabilityResolver for StaticCapabilities {
    fn model_capabilities(
        &self,
        provider: ProviderName,
        model: &str,
        overrides: Option<&ModelOverride>,
    ) -> ModelCapabilities {
        let lowered = model.to_lowercase();
        let overrides = overrides.cloned().unwrap_or_default();

        let supports_fim = overrides
            .supports_fim
            .unwrap_or_else(|| FIM_MODEL_MARKERS.iter().any(|m| lowered.contains(m)));

        let native_tool_style = match overrides.native_tools {
            Some(true) => Self::forced_tool_style(provider),
            Some(false) => None,
            None => Self::default_tool_style(provider),
        };

        let think_tags = match overrides.think_tags {
            Some([open, close]) => Some(ThinkTags { open, close }),
            None if provider.is_local() && INLINE_REASONING_MARKERS.iter().any(|m| lowered.contains(m)) => {
                Some(ThinkTags::default())
            }
            None => None,
        };

        let provider_caps = self.provider_capabilities(provider);
        let can_reason = think_tags.is_some()
            || overrides.reasoning_field.is_some()
            || provider_caps.reasoning_input != ReasoningInput::None;

        ModelCapabilities {
            resolved_model_name: overrides.resolved_name.unwrap_or_else(|| model.to_owned()),
            supports_fim,
            native_tool_style,
            reasoning: ReasoningCapabilities {
                can_reason,
                think_tags,
                reasoning_field: overrides.reasoning_field,
            },
            extra_payload: overrides.extra_payload,
        }
    }

    fn provider_capabilities(&self, provider: ProviderName) -> ProviderCapabilities {
        let (reasoning_input, reasoning_field) = match provider {
            ProviderName::Anthropic => (ReasoningInput::AnthropicThinking, None),
            ProviderName::OpenAi | ProviderName::XAi | ProviderName::MicrosoftAzure => {
                (ReasoningInput::OpenAiEffort, None)
            }
            ProviderName::Deepseek => (ReasoningInput::None, Some("reasoning_content")),
            ProviderName::OpenRouter => (ReasoningInput::OpenRouterReasoning, Some("reasoning")),
            ProviderName::Gemini => (ReasoningInput::GeminiThinkingConfig, None),
            _ => (ReasoningInput::None, None),
        };

        ProviderCapabilities {
            reasoning_input,
            reasoning_field: reasoning_field.map(str::to_owned),
        }
    }

    fn reserved_output_tokens(
        &self,
        provider: ProviderName,
        _model: &str,
        overrides: Option<&ModelOverride>,
    ) -> Option<u32> {
        overrides
            .and_then(|o| o.reserved_output_tokens)
            .or_else(|| (provider == ProviderName::Anthropic).then_some(ANTHROPIC_DEFAULT_MAX_TOKENS))
    }
}
