//! Canonical, provider-agnostic request and stream types
//!
//! Every wire format is translated into and out of these shapes.

pub mod message;
pub mod request;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, Message, Role, ToolCallRecord};
pub use request::{ChatRequest, FimRequest, ListModelsRequest, ModelInfo, ReasoningEffort, ReasoningSelection};
pub use stream::{FinalMessage, IncrementalDelta};
pub use tool::{InternalToolDescriptor, ToolCall};
