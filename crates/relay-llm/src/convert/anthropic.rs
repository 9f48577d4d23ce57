//! Conversion between canonical types and the Anthropic Messages wire format

use indexmap::IndexMap;
use relay_config::ProviderName;

use super::{ChatPlan, Step, StreamDecoder, reasoning_budget, unclaimed_extras};
use crate::accumulator::Accumulator;
use crate::capabilities::{ANTHROPIC_DEFAULT_MAX_TOKENS, ReasoningInput};
use crate::error::{LlmError, classify_in_stream};
use crate::protocol::anthropic::{
    AnthropicBlock, AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicRequest,
    AnthropicStreamBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicThinking, AnthropicTool,
};
use crate::types::{Content, ContentPart, FinalMessage, Message, Role};

/// Reasoning text standing in for an encrypted thinking block
pub const REDACTED_THINKING_MARKER: &str = "[redacted_thinking]";

/// Separator between successive text or thinking blocks
const BLOCK_SEPARATOR: &str = "\n\n";

// -- Outbound: canonical request -> Anthropic wire format --

/// Build the streaming messages request
pub fn build_request(plan: &ChatPlan) -> AnthropicRequest {
    let mut max_tokens = plan.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS);

    let thinking = match plan.reasoning_input {
        ReasoningInput::AnthropicThinking => reasoning_budget(plan.reasoning).map(|budget_tokens| {
            // The thinking budget counts against max_tokens
            if max_tokens <= budget_tokens {
                max_tokens = budget_tokens.saturating_add(max_tokens);
            }
            AnthropicThinking {
                thinking_type: "enabled".to_owned(),
                budget_tokens,
            }
        }),
        _ => None,
    };

    let tools = (!plan.tools.is_empty()).then(|| {
        plan.tools
            .iter()
            .map(|tool| AnthropicTool {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    });

    let mut request = AnthropicRequest {
        model: plan.model.clone(),
        max_tokens,
        system: plan.system.clone(),
        messages: internal_messages_to_anthropic(&plan.messages),
        stream: true,
        tools,
        thinking,
        extra: serde_json::Map::new(),
    };
    request.extra = unclaimed_extras(&request, &plan.extra);
    request
}

/// Convert the history, merging consecutive turns of the same role
///
/// Anthropic requires roles to alternate, and tool results travel as user turns.
fn internal_messages_to_anthropic(messages: &[Message]) -> Vec<AnthropicMessage> {
    let mut out: Vec<AnthropicMessage> = Vec::with_capacity(messages.len());

    for msg in messages {
        let role = match msg.role {
            Role::Assistant => "assistant",
            Role::User | Role::Tool => "user",
        };
        let blocks = internal_message_to_blocks(msg);
        if blocks.is_empty() {
            continue;
        }

        match out.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => out.push(AnthropicMessage {
                role: role.to_owned(),
                content: blocks,
            }),
        }
    }

    out
}

fn internal_message_to_blocks(msg: &Message) -> Vec<AnthropicBlock> {
    if msg.role == Role::Tool {
        return vec![AnthropicBlock::Typed(AnthropicContentBlock::ToolResult {
            tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
            content: msg.content.as_text(),
        })];
    }

    // Signed thinking blocks must precede the rest of the assistant turn
    let mut blocks: Vec<AnthropicBlock> = msg
        .reasoning_blocks
        .iter()
        .flatten()
        .cloned()
        .map(AnthropicBlock::Raw)
        .collect();

    match &msg.content {
        Content::Text(text) if text.is_empty() => {}
        Content::Text(text) => blocks.push(AnthropicBlock::Typed(AnthropicContentBlock::Text { text: text.clone() })),
        Content::Parts(parts) => blocks.extend(parts.iter().map(|part| {
            AnthropicBlock::Typed(match part {
                ContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                ContentPart::Image { url } => AnthropicContentBlock::Image {
                    source: ContentPart::data_uri(url).map_or_else(
                        || AnthropicImageSource::Url { url: url.clone() },
                        |(media_type, data)| AnthropicImageSource::Base64 {
                            media_type: media_type.to_owned(),
                            data: data.to_owned(),
                        },
                    ),
                },
            })
        })),
    }

    if msg.role == Role::Assistant
        && let Some(call) = &msg.tool_call
    {
        blocks.push(AnthropicBlock::Typed(AnthropicContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: serde_json::Value::Object(call.params.clone()),
        }));
    }

    blocks
}

// -- Stream conversion --

/// Content block as the final message snapshot will hold it
#[derive(Debug, Clone)]
enum SnapshotBlock {
    Text,
    Thinking { thinking: String, signature: String },
    RedactedThinking { data: String },
    ToolUse { id: String, name: String, input_json: String },
    Other,
}

impl SnapshotBlock {
    /// Native reasoning block, as Anthropic expects it echoed back
    fn reasoning_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Thinking { thinking, signature } => Some(serde_json::json!({
                "type": "thinking",
                "thinking": thinking,
                "signature": signature,
            })),
            Self::RedactedThinking { data } => Some(serde_json::json!({
                "type": "redacted_thinking",
                "data": data,
            })),
            Self::Text | Self::ToolUse { .. } | Self::Other => None,
        }
    }
}

/// State machine over Anthropic SSE events
///
/// Besides feeding the accumulator it assembles the final message block by
/// block; that snapshot is authoritative for reasoning blocks and the tool call.
#[derive(Debug)]
pub struct AnthropicDecoder {
    provider: ProviderName,
    blocks: IndexMap<usize, SnapshotBlock>,
    /// Index of the tool-use block being surfaced (the first one)
    tool_block: Option<usize>,
    text_separator_pending: bool,
    reasoning_separator_pending: bool,
}

impl AnthropicDecoder {
    pub fn new(provider: ProviderName) -> Self {
        Self {
            provider,
            blocks: IndexMap::new(),
            tool_block: None,
            text_separator_pending: false,
            reasoning_separator_pending: false,
        }
    }

    fn push_text(&mut self, acc: &mut Accumulator, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if std::mem::take(&mut self.text_separator_pending) {
            acc.text.push_str(BLOCK_SEPARATOR);
        }
        acc.text.push_str(fragment);
    }

    fn push_reasoning(&mut self, acc: &mut Accumulator, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if std::mem::take(&mut self.reasoning_separator_pending) {
            acc.reasoning.push_str(BLOCK_SEPARATOR);
        }
        acc.reasoning.push_str(fragment);
    }

    fn start_block(&mut self, index: usize, block: AnthropicStreamBlock, acc: &mut Accumulator) {
        let snapshot = match block {
            AnthropicStreamBlock::Text { text } => {
                self.text_separator_pending = !acc.text.is_empty();
                self.push_text(acc, &text);
                SnapshotBlock::Text
            }
            AnthropicStreamBlock::Thinking { thinking, signature } => {
                self.reasoning_separator_pending = !acc.reasoning.is_empty();
                self.push_reasoning(acc, &thinking);
                SnapshotBlock::Thinking { thinking, signature }
            }
            AnthropicStreamBlock::RedactedThinking { data } => {
                self.reasoning_separator_pending = !acc.reasoning.is_empty();
                self.push_reasoning(acc, REDACTED_THINKING_MARKER);
                SnapshotBlock::RedactedThinking { data }
            }
            AnthropicStreamBlock::ToolUse { id, name } => {
                if self.tool_block.is_none() {
                    self.tool_block = Some(index);
                    acc.tool_id.clone_from(&id);
                    acc.tool_name.clone_from(&name);
                } else {
                    tracing::debug!(provider = %self.provider, tool = %name, "ignoring additional tool use block");
                }
                SnapshotBlock::ToolUse {
                    id,
                    name,
                    input_json: String::new(),
                }
            }
            AnthropicStreamBlock::Unknown => SnapshotBlock::Other,
        };
        self.blocks.insert(index, snapshot);
    }

    fn apply_delta(&mut self, index: usize, delta: AnthropicStreamDelta, acc: &mut Accumulator) {
        match delta {
            AnthropicStreamDelta::TextDelta { text } => self.push_text(acc, &text),
            AnthropicStreamDelta::ThinkingDelta { thinking } => {
                self.push_reasoning(acc, &thinking);
                if let Some(SnapshotBlock::Thinking { thinking: block, .. }) = self.blocks.get_mut(&index) {
                    block.push_str(&thinking);
                }
            }
            AnthropicStreamDelta::SignatureDelta { signature } => {
                if let Some(SnapshotBlock::Thinking { signature: block, .. }) = self.blocks.get_mut(&index) {
                    block.push_str(&signature);
                }
            }
            AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                if let Some(SnapshotBlock::ToolUse { input_json, .. }) = self.blocks.get_mut(&index) {
                    input_json.push_str(&partial_json);
                }
                if self.tool_block == Some(index) {
                    acc.tool_params.push_str(&partial_json);
                }
            }
            AnthropicStreamDelta::Unknown => {}
        }
    }
}

impl StreamDecoder for AnthropicDecoder {
    type Chunk = AnthropicStreamEvent;

    fn decode(&mut self, event: AnthropicStreamEvent, acc: &mut Accumulator) -> Result<Step, LlmError> {
        let before = acc.progress();

        match event {
            AnthropicStreamEvent::ContentBlockStart { index, content_block } => {
                self.start_block(index, content_block, acc);
            }
            AnthropicStreamEvent::ContentBlockDelta { index, delta } => self.apply_delta(index, delta, acc),
            AnthropicStreamEvent::MessageStop => return Ok(Step::Finished),
            AnthropicStreamEvent::Error { error } => {
                return Err(classify_in_stream(self.provider, &serde_json::json!({ "error": error })));
            }
            AnthropicStreamEvent::MessageStart
            | AnthropicStreamEvent::ContentBlockStop { .. }
            | AnthropicStreamEvent::MessageDelta
            | AnthropicStreamEvent::Ping
            | AnthropicStreamEvent::Unknown => {}
        }

        Ok(if acc.progress() == before { Step::Unchanged } else { Step::Changed })
    }

    fn finish(self, mut acc: Accumulator) -> Result<FinalMessage, LlmError> {
        if let Some(SnapshotBlock::ToolUse { id, name, input_json }) =
            self.tool_block.and_then(|index| self.blocks.get(&index))
        {
            acc.tool_id.clone_from(id);
            acc.tool_name.clone_from(name);
            acc.tool_params.clone_from(input_json);
        }

        let reasoning_blocks = self.blocks.values().filter_map(SnapshotBlock::reasoning_json).collect();
        acc.finish(Some(reasoning_blocks))
    }
}
