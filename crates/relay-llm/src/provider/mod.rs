//! Provider dispatch table and per-family transports
//!
//! Every provider maps to a [`ProviderEntry`] of plain function pointers; an
//! operation a provider does not offer is `None` rather than a stub that fails
//! at runtime.

mod anthropic;
mod credentials;
mod division;
mod google;
pub(crate) mod http;
mod ollama;
mod openai;

use futures_util::future::BoxFuture;
use relay_config::{ProviderName, ProviderSettings};

use crate::abort::AbortHandle;
use crate::convert::ChatPlan;
use crate::error::LlmError;
use crate::sink::ChatSink;
use crate::types::{FimRequest, FinalMessage, ModelInfo};

/// Everything a transport needs besides the request itself
#[derive(Debug)]
pub struct ProviderContext<'a> {
    pub provider: ProviderName,
    pub settings: &'a ProviderSettings,
    /// Whether API keys may come from environment variables
    pub allow_env_credentials: bool,
    pub abort: AbortHandle,
}

impl ProviderContext<'_> {
    /// Configured endpoint, or the provider's default
    fn endpoint(&self) -> Result<String, LlmError> {
        self.settings
            .endpoint
            .as_ref()
            .map(|url| url.as_str().trim_end_matches('/').to_owned())
            .or_else(|| self.provider.default_endpoint().map(str::to_owned))
            .ok_or_else(|| {
                LlmError::config(format!(
                    "{} endpoint is not set. Add it in the provider settings.",
                    self.provider.title()
                ))
            })
    }
}

/// Streams a chat request into the sink
pub type SendChatFn = for<'a> fn(&'a ProviderContext<'a>, ChatPlan, &'a mut dyn ChatSink) -> BoxFuture<'a, ()>;

/// Streams a fill-in-middle completion into the sink
///
/// The request's model is already the resolved upstream name.
pub type SendFimFn = for<'a> fn(&'a ProviderContext<'a>, FimRequest, &'a mut dyn ChatSink) -> BoxFuture<'a, ()>;

/// Lists the models a provider currently serves
pub type ListModelsFn = for<'a> fn(&'a ProviderContext<'a>) -> BoxFuture<'a, Result<Vec<ModelInfo>, LlmError>>;

/// Operations available for one provider
#[derive(Clone, Copy)]
pub struct ProviderEntry {
    pub send_chat: SendChatFn,
    pub send_fim: Option<SendFimFn>,
    pub list_models: Option<ListModelsFn>,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("send_fim", &self.send_fim.is_some())
            .field("list_models", &self.list_models.is_some())
            .finish_non_exhaustive()
    }
}

/// Dispatch entry for a provider
pub const fn entry(provider: ProviderName) -> ProviderEntry {
    match provider {
        ProviderName::Anthropic => ProviderEntry {
            send_chat: anthropic::send_chat,
            send_fim: None,
            list_models: None,
        },
        ProviderName::Gemini => ProviderEntry {
            send_chat: google::send_chat,
            send_fim: None,
            list_models: None,
        },
        ProviderName::Division => ProviderEntry {
            send_chat: division::send_chat,
            send_fim: None,
            list_models: None,
        },
        ProviderName::Mistral => ProviderEntry {
            send_chat: openai::send_chat,
            send_fim: Some(openai::send_mistral_fim),
            list_models: None,
        },
        ProviderName::Ollama => ProviderEntry {
            send_chat: openai::send_chat,
            send_fim: Some(ollama::send_fim),
            list_models: Some(ollama::list_models),
        },
        ProviderName::VLlm | ProviderName::LmStudio => ProviderEntry {
            send_chat: openai::send_chat,
            send_fim: Some(openai::send_fim),
            list_models: Some(openai::list_models),
        },
        ProviderName::OpenAiCompatible | ProviderName::OpenRouter | ProviderName::LiteLlm => ProviderEntry {
            send_chat: openai::send_chat,
            send_fim: Some(openai::send_fim),
            list_models: None,
        },
        ProviderName::OpenAi
        | ProviderName::XAi
        | ProviderName::Deepseek
        | ProviderName::Groq
        | ProviderName::GoogleVertex
        | ProviderName::MicrosoftAzure
        | ProviderName::AwsBedrock => ProviderEntry {
            send_chat: openai::send_chat,
            send_fim: None,
            list_models: None,
        },
    }
}

/// Report a failure that happened before or outside the stream
///
/// After an abort the failure is the cancellation itself, so the request
/// resolves as an empty final message instead.
fn fail(sink: &mut dyn ChatSink, abort: &AbortHandle, error: LlmError) {
    if abort.is_aborted() {
        tracing::debug!(error = %error, "failure after abort resolved as cancellation");
        sink.on_final_message(FinalMessage::empty());
    } else {
        sink.on_error(error);
    }
}

/// Deliver a completion that arrived in one piece
fn deliver_whole(sink: &mut dyn ChatSink, abort: &AbortHandle, text: String) {
    if abort.is_aborted() {
        sink.on_final_message(FinalMessage::empty());
        return;
    }
    if !text.is_empty() {
        sink.on_text(&crate::types::IncrementalDelta {
            full_text: text.clone(),
            ..Default::default()
        });
    }
    sink.on_final_message(FinalMessage::text(text));
}
