//! Per-request accumulation of streamed output

use crate::error::LlmError;
use crate::types::{FinalMessage, IncrementalDelta, ToolCall};

/// Everything a stream has produced so far
///
/// One value lives for exactly one request and is threaded through every
/// decoding step; nothing is shared between requests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Accumulator {
    pub text: String,
    pub reasoning: String,
    pub tool_id: String,
    pub tool_name: String,
    /// Raw argument text, parsed only at finalization
    pub tool_params: String,
}

impl Accumulator {
    /// Whether nothing usable has arrived
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.reasoning.is_empty() && self.tool_name.is_empty()
    }

    /// Lengths of every accumulated field
    ///
    /// Fields only ever grow, so equal progress means nothing changed.
    pub fn progress(&self) -> [usize; 5] {
        [
            self.text.len(),
            self.reasoning.len(),
            self.tool_id.len(),
            self.tool_name.len(),
            self.tool_params.len(),
        ]
    }

    /// Cumulative delta for `on_text`
    ///
    /// The tool call is absent until a tool name has accumulated.
    pub fn snapshot(&self) -> IncrementalDelta {
        IncrementalDelta {
            full_text: self.text.clone(),
            full_reasoning: self.reasoning.clone(),
            tool_call: (!self.tool_name.is_empty()).then(|| ToolCall::pending(&self.tool_id, &self.tool_name)),
        }
    }

    /// Terminal message for a stream that ended normally
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EmptyResponse`] when no text, reasoning or tool name arrived.
    pub fn finish(self, native_reasoning: Option<Vec<serde_json::Value>>) -> Result<FinalMessage, LlmError> {
        if self.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        let tool_call = if self.tool_name.is_empty() {
            None
        } else {
            let id = if self.tool_id.is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                self.tool_id
            };
            let call = ToolCall::from_raw_params(&id, &self.tool_name, &self.tool_params);
            if call.is_none() {
                tracing::debug!(tool = %self.tool_name, "dropping tool call with malformed arguments");
            }
            call
        };

        Ok(FinalMessage {
            full_text: self.text,
            full_reasoning: self.reasoning,
            native_reasoning,
            tool_call,
        })
    }
}
