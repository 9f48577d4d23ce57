use serde::{Deserialize, Serialize};

/// Role of a message author
///
/// The system message travels separately on [`crate::ChatRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Result of a tool call
    Tool,
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
    /// Tool call the assistant made in this turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRecord>,
    /// For tool results: id of the call being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool results: name of the tool that ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Native reasoning blocks returned with an earlier assistant turn
    ///
    /// Anthropic requires these to be echoed back verbatim when extended
    /// thinking is combined with tool use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_blocks: Option<Vec<serde_json::Value>>,
}

impl Message {
    fn new(role: Role, content: Content) -> Self {
        Self {
            role,
            content,
            tool_call: None,
            tool_call_id: None,
            name: None,
            reasoning_blocks: None,
        }
    }

    /// Plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::Text(text.into()))
    }

    /// Plain-text assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::Text(text.into()))
    }

    /// Result of running a tool
    pub fn tool_result(id: impl Into<String>, name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(id.into()),
            name: Some(name.into()),
            ..Self::new(Role::Tool, Content::Text(output.into()))
        }
    }

    /// Attach the tool call the assistant made
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCallRecord) -> Self {
        self.tool_call = Some(call);
        self
    }
}

/// Message content, either plain text or structured parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content
    Text(String),
    /// Array of content parts
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Text content, with parts concatenated and images dropped
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect(),
        }
    }

    /// Whether there is nothing to send
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }
}

/// Individual part within a multipart message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text block
    Text {
        /// The text string
        text: String,
    },
    /// Image reference
    Image {
        /// URL or base64 data URI
        url: String,
    },
}

impl ContentPart {
    /// Split a `data:<mime>;base64,<payload>` URI into mime type and payload
    pub fn data_uri(url: &str) -> Option<(&str, &str)> {
        let rest = url.strip_prefix("data:")?;
        let (meta, data) = rest.split_once(',')?;
        let mime = meta.strip_suffix(";base64")?;
        Some((mime, data))
    }
}

/// A tool call made by the assistant in an earlier turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Provider-assigned call id
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments the model supplied
    pub params: serde_json::Map<String, serde_json::Value>,
}
