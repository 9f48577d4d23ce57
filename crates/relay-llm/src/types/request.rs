use relay_config::{ChatMode, ProviderName};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::message::Message;
use super::tool::InternalToolDescriptor;
use crate::abort::AbortRegistration;

/// How much deliberation the model should spend, if it can reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningSelection {
    /// No reasoning requested
    #[default]
    Off,
    /// Token budget for reasoning
    Budget(u32),
    /// Qualitative effort level
    Effort(ReasoningEffort),
}

impl ReasoningSelection {
    /// Whether any reasoning was requested
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Effort level for providers that take a qualitative setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Canonical chat request
#[derive(Debug)]
pub struct ChatRequest {
    /// Target provider
    pub provider: ProviderName,
    /// Requested model name (before capability resolution)
    pub model: String,
    /// System message, sent separately from the history
    pub system_message: Option<String>,
    /// Ordered conversation history
    pub messages: Vec<Message>,
    /// Interaction mode the tools were derived from
    pub mode: ChatMode,
    /// Tools enabled for this turn
    pub tools: Vec<InternalToolDescriptor>,
    /// Reasoning configuration
    pub reasoning: ReasoningSelection,
    /// Receives the abort handle once the request is under way
    pub abort: Option<AbortRegistration>,
}

impl ChatRequest {
    /// Request with no tools, no reasoning and no abort registration
    pub fn new(provider: ProviderName, model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_message: None,
            messages,
            mode: ChatMode::Normal,
            tools: Vec::new(),
            reasoning: ReasoningSelection::Off,
            abort: None,
        }
    }

    #[must_use]
    pub fn with_system_message(mut self, system: impl Into<String>) -> Self {
        self.system_message = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_tools(mut self, mode: ChatMode, tools: Vec<InternalToolDescriptor>) -> Self {
        self.mode = mode;
        self.tools = tools;
        self
    }

    #[must_use]
    pub const fn with_reasoning(mut self, reasoning: ReasoningSelection) -> Self {
        self.reasoning = reasoning;
        self
    }

    #[must_use]
    pub fn with_abort(mut self, registration: AbortRegistration) -> Self {
        self.abort = Some(registration);
        self
    }
}

/// Fill-in-middle request
#[derive(Debug)]
pub struct FimRequest {
    /// Target provider
    pub provider: ProviderName,
    /// Requested model name
    pub model: String,
    /// Text before the cursor
    pub prefix: String,
    /// Text after the cursor
    pub suffix: String,
    /// Sequences that end the completion
    pub stop: Vec<String>,
    /// Receives the abort handle once the request is under way
    pub abort: Option<AbortRegistration>,
}

impl FimRequest {
    pub fn new(
        provider: ProviderName,
        model: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
            stop: Vec::new(),
            abort: None,
        }
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn with_abort(mut self, registration: AbortRegistration) -> Self {
        self.abort = Some(registration);
        self
    }
}

/// Request for the models a provider currently serves
#[derive(Debug, Clone, Copy)]
pub struct ListModelsRequest {
    /// Provider to ask
    pub provider: ProviderName,
}

/// A model advertised by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier to pass as the request model
    pub id: String,
    /// Owner or family, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}
