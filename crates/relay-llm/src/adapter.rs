//! Entry point tying configuration, capabilities, wrappers and transports together

use relay_config::{Config, ProviderName, ProviderSettings};

use crate::abort::{AbortHandle, install};
use crate::capabilities::{CapabilityResolver, StaticCapabilities, ThinkTags};
use crate::convert::ChatPlan;
use crate::error::LlmError;
use crate::provider::{ProviderContext, entry};
use crate::sink::{ChatSink, Guarded};
use crate::tools::{ConfigToolCatalog, ToolCatalog};
use crate::types::{
    ChatRequest, FimRequest, InternalToolDescriptor, ListModelsRequest, ModelInfo, ReasoningSelection,
};
use crate::wrappers::{ReasoningTagExtractor, XmlToolCallExtractor, xml_tools_system_section};

/// Unified streaming-completion adapter
///
/// Holds no per-request state, so one instance can serve concurrent requests.
pub struct Adapter {
    config: Config,
    capabilities: Box<dyn CapabilityResolver>,
    catalog: Box<dyn ToolCatalog>,
    unconfigured: ProviderSettings,
}

/// Fallback layers to install around the caller's sink
#[derive(Debug, Default)]
struct Layers {
    think_tags: Option<ThinkTags>,
    xml_tools: Option<Vec<InternalToolDescriptor>>,
}

impl Adapter {
    /// Adapter with the built-in capability heuristics and the configured tool catalog
    pub fn new(config: Config) -> Self {
        let catalog = ConfigToolCatalog::new(&config.tools);
        Self {
            config,
            capabilities: Box::new(StaticCapabilities),
            catalog: Box::new(catalog),
            unconfigured: ProviderSettings::default(),
        }
    }

    /// Replace the capability resolver
    #[must_use]
    pub fn with_capabilities(mut self, resolver: impl CapabilityResolver + 'static) -> Self {
        self.capabilities = Box::new(resolver);
        self
    }

    /// Replace the tool catalog
    #[must_use]
    pub fn with_tool_catalog(mut self, catalog: impl ToolCatalog + 'static) -> Self {
        self.catalog = Box::new(catalog);
        self
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn settings(&self, provider: ProviderName) -> &ProviderSettings {
        self.config.provider(provider).unwrap_or(&self.unconfigured)
    }

    fn context(&self, provider: ProviderName, abort: AbortHandle) -> ProviderContext<'_> {
        ProviderContext {
            provider,
            settings: self.settings(provider),
            allow_env_credentials: self.config.allow_env_credentials,
            abort,
        }
    }

    /// Requested model, or the provider's configured default
    fn model_for(&self, provider: ProviderName, requested: &str) -> Result<String, LlmError> {
        if !requested.trim().is_empty() {
            return Ok(requested.to_owned());
        }
        self.settings(provider)
            .default_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| LlmError::config(format!("No model selected for {}.", provider.title())))
    }

    /// Resolve a chat request into a wire plan and the wrappers it needs
    fn plan_chat(&self, request: ChatRequest) -> Result<(ChatPlan, Layers), LlmError> {
        let provider = request.provider;
        let model = self.model_for(provider, &request.model)?;
        let overrides = self.settings(provider).models.get(&model);

        let caps = self.capabilities.model_capabilities(provider, &model, overrides);
        let provider_caps = self.capabilities.provider_capabilities(provider);
        let tools: Vec<_> = self
            .catalog
            .available_tools(request.mode, &request.tools)
            .into_values()
            .collect();

        let mut plan = ChatPlan::new(provider, caps.resolved_model_name, request.messages);
        plan.system = request.system_message;
        plan.reasoning = if caps.reasoning.can_reason {
            request.reasoning
        } else {
            ReasoningSelection::Off
        };
        plan.reasoning_input = provider_caps.reasoning_input;
        plan.reasoning_field = caps.reasoning.reasoning_field.or(provider_caps.reasoning_field);
        plan.max_tokens = self.capabilities.reserved_output_tokens(provider, &model, overrides);
        plan.extra = caps.extra_payload;

        let mut layers = Layers {
            think_tags: caps.reasoning.think_tags,
            xml_tools: None,
        };

        if !tools.is_empty() {
            if caps.native_tool_style.is_some() {
                plan.tools = tools;
            } else {
                let section = xml_tools_system_section(&tools);
                plan.system = Some(match plan.system.take() {
                    Some(system) if !system.is_empty() => format!("{system}\n\n{section}"),
                    _ => section,
                });
                layers.xml_tools = Some(tools);
            }
        }

        Ok((plan, layers))
    }

    /// Stream a chat completion into `sink`
    ///
    /// The abort registration, if any, receives its handle before the first
    /// network call. The sink sees zero or more `on_text` calls followed by
    /// exactly one `on_final_message` or `on_error`.
    pub async fn send_chat(&self, mut request: ChatRequest, sink: impl ChatSink) {
        let abort = install(request.abort.take());
        let provider = request.provider;

        let (plan, layers) = match self.plan_chat(request) {
            Ok(planned) => planned,
            Err(e) => {
                Guarded::new(sink, abort).on_error(e);
                return;
            }
        };

        let mut sink: Box<dyn ChatSink + '_> = Box::new(sink);
        if let Some(tools) = layers.xml_tools {
            sink = Box::new(XmlToolCallExtractor::new(sink, tools));
        }
        if let Some(tags) = layers.think_tags {
            sink = Box::new(ReasoningTagExtractor::new(sink, tags));
        }
        let mut guarded = Guarded::new(sink, abort.clone());

        tracing::debug!(provider = %provider, model = %plan.model, tools = plan.tools.len(), "sending chat request");
        let ctx = self.context(provider, abort);
        (entry(provider).send_chat)(&ctx, plan, &mut guarded).await;

        if !guarded.is_finished() {
            tracing::debug!(provider = %provider, "transport returned without a terminal callback");
            guarded.on_error(LlmError::EmptyResponse);
        }
    }

    /// Stream a fill-in-middle completion into `sink`
    pub async fn send_fill_in_middle(&self, mut request: FimRequest, sink: impl ChatSink) {
        let abort = install(request.abort.take());
        let provider = request.provider;
        let mut guarded = Guarded::new(sink, abort.clone());

        let Some(send_fim) = entry(provider).send_fim else {
            guarded.on_error(LlmError::Unsupported(format!(
                "{} does not support fill-in-middle.",
                provider.title()
            )));
            return;
        };

        let model = match self.model_for(provider, &request.model) {
            Ok(model) => model,
            Err(e) => {
                guarded.on_error(e);
                return;
            }
        };
        let overrides = self.settings(provider).models.get(&model);
        let caps = self.capabilities.model_capabilities(provider, &model, overrides);

        if !caps.supports_fim {
            let message = if caps.resolved_model_name == model {
                format!("Model {model} does not support FIM.")
            } else {
                format!("Model {model} ({}) does not support FIM.", caps.resolved_model_name)
            };
            guarded.on_error(LlmError::Unsupported(message));
            return;
        }

        request.model = caps.resolved_model_name;
        tracing::debug!(provider = %provider, model = %request.model, "sending fill-in-middle request");
        let ctx = self.context(provider, abort);
        send_fim(&ctx, request, &mut guarded).await;

        if !guarded.is_finished() {
            guarded.on_error(LlmError::EmptyResponse);
        }
    }

    /// Models the provider currently serves
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unsupported`] for providers without a listing
    /// endpoint, otherwise whatever the request or response parsing hit.
    pub async fn list_models(&self, request: ListModelsRequest) -> Result<Vec<ModelInfo>, LlmError> {
        let provider = request.provider;
        let Some(list_models) = entry(provider).list_models else {
            return Err(LlmError::Unsupported(format!(
                "{} does not support listing models.",
                provider.title()
            )));
        };

        let ctx = self.context(provider, AbortHandle::default());
        list_models(&ctx).await
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use relay_config::{ChatMode, ModelOverride, ToolConfig};

    use super::*;
    use crate::abort::AbortRegistration;
    use crate::capabilities::ReasoningInput;
    use crate::error::ErrorKind;
    use crate::sink::testing::Recorder;
    use crate::types::{Message, ReasoningEffort};

    fn config(providers: Vec<(ProviderName, ProviderSettings)>) -> Config {
        Config {
            allow_env_credentials: false,
            providers: providers.into_iter().collect(),
            tools: vec![ToolConfig {
                name: "read_file".into(),
                description: "Read a file".into(),
                modes: vec![ChatMode::Gather, ChatMode::Agent],
                params: IndexMap::from([("uri".to_owned(), "Absolute path".to_owned())]),
            }],
        }
    }

    fn chat(provider: ProviderName, model: &str) -> ChatRequest {
        ChatRequest::new(provider, model, vec![Message::user("hi")])
    }

    #[test]
    fn native_tools_are_declared_on_the_wire() {
        let adapter = Adapter::new(config(Vec::new()));
        let request = chat(ProviderName::Anthropic, "claude-sonnet-4").with_tools(ChatMode::Agent, Vec::new());
        let (plan, layers) = adapter.plan_chat(request).unwrap();

        assert_eq!(plan.tools.len(), 1);
        assert!(layers.xml_tools.is_none());
        assert_eq!(plan.max_tokens, Some(crate::capabilities::ANTHROPIC_DEFAULT_MAX_TOKENS));
    }

    #[test]
    fn tools_without_native_support_go_through_the_system_message() {
        let adapter = Adapter::new(config(Vec::new()));
        let request = chat(ProviderName::Ollama, "llama3.1")
            .with_system_message("You are helpful.")
            .with_tools(ChatMode::Gather, Vec::new());
        let (plan, layers) = adapter.plan_chat(request).unwrap();

        assert!(plan.tools.is_empty());
        let system = plan.system.unwrap();
        assert!(system.starts_with("You are helpful.\n\nAvailable tools:"));
        assert_eq!(layers.xml_tools.unwrap()[0].name, "read_file");
    }

    #[test]
    fn normal_mode_offers_no_tools() {
        let adapter = Adapter::new(config(Vec::new()));
        let (plan, layers) = adapter.plan_chat(chat(ProviderName::Ollama, "llama3.1")).unwrap();
        assert!(plan.tools.is_empty());
        assert!(plan.system.is_none());
        assert!(layers.xml_tools.is_none());
    }

    #[test]
    fn overrides_resolve_model_and_inline_reasoning() {
        let settings = ProviderSettings {
            models: [(
                "qwen".to_owned(),
                ModelOverride {
                    resolved_name: Some("qwen3:32b".into()),
                    ..ModelOverride::default()
                },
            )]
            .into(),
            ..ProviderSettings::default()
        };
        let adapter = Adapter::new(config(vec![(ProviderName::Ollama, settings)]));
        let (plan, layers) = adapter.plan_chat(chat(ProviderName::Ollama, "qwen")).unwrap();

        assert_eq!(plan.model, "qwen3:32b");
        // Heuristics run on the requested name, which carries no reasoning marker
        assert!(layers.think_tags.is_none());

        let (_, layers) = adapter.plan_chat(chat(ProviderName::Ollama, "qwen3:8b")).unwrap();
        assert_eq!(layers.think_tags, Some(ThinkTags::default()));
    }

    #[test]
    fn reasoning_is_dropped_for_models_that_cannot_reason() {
        let adapter = Adapter::new(config(Vec::new()));
        let request = chat(ProviderName::Groq, "llama-3.3-70b")
            .with_reasoning(ReasoningSelection::Effort(ReasoningEffort::High));
        let (plan, _) = adapter.plan_chat(request).unwrap();
        assert_eq!(plan.reasoning, ReasoningSelection::Off);

        let request =
            chat(ProviderName::OpenAi, "o3").with_reasoning(ReasoningSelection::Effort(ReasoningEffort::High));
        let (plan, _) = adapter.plan_chat(request).unwrap();
        assert_eq!(plan.reasoning_input, ReasoningInput::OpenAiEffort);
        assert!(plan.reasoning.is_enabled());
    }

    #[test]
    fn default_model_fills_an_empty_request() {
        let settings = ProviderSettings {
            default_model: Some("gpt-4o-mini".into()),
            ..ProviderSettings::default()
        };
        let adapter = Adapter::new(config(vec![(ProviderName::OpenAi, settings)]));
        let (plan, _) = adapter.plan_chat(chat(ProviderName::OpenAi, "")).unwrap();
        assert_eq!(plan.model, "gpt-4o-mini");

        let err = adapter.plan_chat(chat(ProviderName::Groq, " ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let adapter = Adapter::new(config(Vec::new()));
        let (registration, handle) = AbortRegistration::channel();
        let mut recorder = Recorder::default();

        adapter
            .send_chat(chat(ProviderName::Anthropic, "claude-sonnet-4").with_abort(registration), &mut recorder)
            .await;

        // The handle was handed out even though the request failed early
        assert!(handle.await.is_ok());
        assert_eq!(recorder.errors.len(), 1);
        assert_eq!(recorder.errors[0].kind(), ErrorKind::Config);
        assert!(recorder.finals.is_empty());
    }

    #[tokio::test]
    async fn fim_is_refused_for_models_without_support() {
        let settings = ProviderSettings {
            models: [(
                "coder".to_owned(),
                ModelOverride {
                    resolved_name: Some("mistral-large-latest".into()),
                    supports_fim: Some(false),
                    ..ModelOverride::default()
                },
            )]
            .into(),
            ..ProviderSettings::default()
        };
        let adapter = Adapter::new(config(vec![(ProviderName::Mistral, settings)]));

        let mut recorder = Recorder::default();
        adapter
            .send_fill_in_middle(FimRequest::new(ProviderName::Mistral, "coder", "fn a(", ")"), &mut recorder)
            .await;
        assert_eq!(recorder.errors[0].kind(), ErrorKind::Unsupported);
        assert_eq!(
            recorder.errors[0].to_string(),
            "Model coder (mistral-large-latest) does not support FIM."
        );

        let mut recorder = Recorder::default();
        adapter
            .send_fill_in_middle(FimRequest::new(ProviderName::Mistral, "mistral-small", "a", "b"), &mut recorder)
            .await;
        assert_eq!(recorder.errors[0].to_string(), "Model mistral-small does not support FIM.");
    }

    #[tokio::test]
    async fn fim_is_refused_for_providers_without_it() {
        let adapter = Adapter::new(config(Vec::new()));
        let mut recorder = Recorder::default();
        adapter
            .send_fill_in_middle(FimRequest::new(ProviderName::Anthropic, "claude", "a", "b"), &mut recorder)
            .await;
        assert_eq!(recorder.errors.len(), 1);
        assert_eq!(recorder.errors[0].kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn listing_is_refused_for_providers_without_it() {
        let adapter = Adapter::new(config(Vec::new()));
        let err = adapter
            .list_models(ListModelsRequest {
                provider: ProviderName::OpenAi,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn abort_before_dispatch_resolves_empty() {
        let adapter = Adapter::new(config(Vec::new()));
        let registration = AbortRegistration::new(|handle| handle.abort());
        let mut recorder = Recorder::default();

        adapter
            .send_chat(chat(ProviderName::Anthropic, "claude-sonnet-4").with_abort(registration), &mut recorder)
            .await;

        assert_eq!(recorder.final_message(), &crate::types::FinalMessage::empty());
    }
}
