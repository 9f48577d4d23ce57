//! Unified streaming-completion adapter for LLM providers
//!
//! Normalizes the request shapes and streaming output of vendor APIs
//! (`OpenAI`-compatible gateways, Anthropic, Gemini, local servers) into one
//! event model: cumulative text, cumulative reasoning and a tool call, delivered
//! through a [`ChatSink`]. Reasoning tags and XML tool calls are recovered from
//! plain text when a model has no native support.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod abort;
pub mod accumulator;
pub mod adapter;
pub mod capabilities;
pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod sink;
pub mod tools;
pub mod types;
pub mod wrappers;

pub use abort::{AbortHandle, AbortRegistration};
pub use adapter::Adapter;
pub use capabilities::{CapabilityResolver, ModelCapabilities, StaticCapabilities};
pub use error::{ErrorKind, LlmError};
pub use sink::{Callbacks, ChannelSink, ChatEvent, ChatSink, channel};
pub use tools::{ConfigToolCatalog, ToolCatalog};
pub use types::{
    ChatRequest, FimRequest, FinalMessage, IncrementalDelta, InternalToolDescriptor, ListModelsRequest, Message,
    ModelInfo, ReasoningEffort, ReasoningSelection, ToolCall,
};
