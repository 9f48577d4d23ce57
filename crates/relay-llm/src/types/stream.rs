use serde::{Deserialize, Serialize};

use super::tool::ToolCall;

/// Cumulative snapshot emitted through `on_text`
///
/// Every emission carries everything received so far, never a fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementalDelta {
    /// Answer text so far
    pub full_text: String,
    /// Reasoning text so far
    pub full_reasoning: String,
    /// Tool call in progress, absent until a tool name has arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

/// Terminal result of a successful (or cancelled) request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalMessage {
    /// Complete answer text
    pub full_text: String,
    /// Complete reasoning text
    pub full_reasoning: String,
    /// Structured reasoning blocks, only from Anthropic-style providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_reasoning: Option<Vec<serde_json::Value>>,
    /// Completed tool call, absent if none was made or its arguments were malformed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl FinalMessage {
    /// Result reported when the user cancels
    pub fn empty() -> Self {
        Self::default()
    }

    /// Final message carrying only text
    pub fn text(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            ..Self::default()
        }
    }
}
