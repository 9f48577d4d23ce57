//! Anthropic Messages API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Anthropic messages API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicRequest {
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate (required by Anthropic)
    pub max_tokens: u32,
    /// System prompt (top-level, not in messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Conversation messages
    pub messages: Vec<AnthropicMessage>,
    /// Always true for chat
    pub stream: bool,
    /// Tool definitions, omitted rather than empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    /// Extended thinking configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicThinking>,
    /// Model-specific extras merged at the top level
    ///
    /// Never holds a key that a typed field of this request also serializes.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Extended thinking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicThinking {
    /// Always "enabled"
    #[serde(rename = "type")]
    pub thinking_type: String,
    /// Tokens the model may spend thinking
    pub budget_tokens: u32,
}

/// Anthropic message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role ("user" or "assistant")
    pub role: String,
    /// Content blocks
    pub content: Vec<AnthropicBlock>,
}

/// Outbound block, either typed or echoed verbatim
///
/// Thinking blocks from earlier turns carry signatures and must be sent back
/// untouched, so they travel as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicBlock {
    /// Block constructed by the adapter
    Typed(AnthropicContentBlock),
    /// Block returned by Anthropic in an earlier turn
    Raw(serde_json::Value),
}

/// Content block in an Anthropic message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Text content
    Text {
        /// The text string
        text: String,
    },
    /// Image content
    Image {
        /// Image source
        source: AnthropicImageSource,
    },
    /// Tool use request from the assistant
    ToolUse {
        /// Tool use identifier
        id: String,
        /// Tool name
        name: String,
        /// Tool input as JSON
        input: serde_json::Value,
    },
    /// Tool result from the user
    ToolResult {
        /// Tool use ID this result responds to
        tool_use_id: String,
        /// Result content
        content: String,
    },
}

/// Anthropic image source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicImageSource {
    /// Inline base64 payload
    Base64 {
        /// Media type (e.g. "image/png")
        media_type: String,
        /// Base64 data
        data: String,
    },
    /// Remote image
    Url {
        /// Image URL
        url: String,
    },
}

/// Anthropic tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTool {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,
}

// -- Streaming types --

/// Anthropic SSE event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// Stream started
    MessageStart,
    /// New content block started
    ContentBlockStart {
        /// Block index
        index: usize,
        /// Initial block content
        content_block: AnthropicStreamBlock,
    },
    /// Incremental content within a block
    ContentBlockDelta {
        /// Block index
        index: usize,
        /// Delta content
        delta: AnthropicStreamDelta,
    },
    /// Content block finished
    ContentBlockStop {
        /// Block index
        index: usize,
    },
    /// Message metadata delta (stop reason, usage)
    MessageDelta,
    /// Stream completed
    MessageStop,
    /// Keep-alive
    Ping,
    /// Failure reported inside the stream
    Error {
        /// Error details
        error: AnthropicErrorDetail,
    },
    /// Event types added after this was written
    #[serde(other)]
    Unknown,
}

/// Content block in a `content_block_start` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamBlock {
    /// Text block
    Text {
        /// Initial text (usually empty)
        #[serde(default)]
        text: String,
    },
    /// Visible reasoning
    Thinking {
        /// Initial thinking (usually empty)
        #[serde(default)]
        thinking: String,
        /// Signature, usually delivered later by a delta
        #[serde(default)]
        signature: String,
    },
    /// Encrypted reasoning
    RedactedThinking {
        /// Opaque payload
        data: String,
    },
    /// Tool use block
    ToolUse {
        /// Tool use ID
        id: String,
        /// Tool name
        name: String,
    },
    /// Block types added after this was written
    #[serde(other)]
    Unknown,
}

/// Delta within a `content_block_delta` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamDelta {
    /// Text fragment
    TextDelta {
        /// The text fragment
        text: String,
    },
    /// Thinking fragment
    ThinkingDelta {
        /// The thinking fragment
        thinking: String,
    },
    /// Signature of the current thinking block
    SignatureDelta {
        /// Signature
        signature: String,
    },
    /// Partial tool input JSON
    InputJsonDelta {
        /// JSON fragment
        partial_json: String,
    },
    /// Delta types added after this was written
    #[serde(other)]
    Unknown,
}

/// Anthropic error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicErrorDetail {
    /// Error type (e.g. `overloaded_error`)
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}
