//! Conversion between canonical types and the `OpenAI` chat-completions wire format

use relay_config::ProviderName;

use super::{ChatPlan, Step, StreamDecoder, reasoning_budget, reasoning_effort, unclaimed_extras};
use crate::accumulator::Accumulator;
use crate::capabilities::ReasoningInput;
use crate::error::{LlmError, classify_in_stream};
use crate::protocol::openai::{
    OpenAiCompletionRequest, OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl,
    OpenAiMessage, OpenAiRequest, OpenAiStreamChunk, OpenAiTool, OpenAiToolCall,
};
use crate::types::{Content, ContentPart, FimRequest, Message, ReasoningSelection, Role};

/// Completion length cap for fill-in-middle
pub const FIM_MAX_TOKENS: u32 = 300;

// -- Outbound: canonical request -> OpenAI wire format --

/// Build the streaming chat request
pub fn build_request(plan: &ChatPlan) -> OpenAiRequest {
    let mut messages = Vec::with_capacity(plan.messages.len() + 1);
    if let Some(system) = &plan.system {
        messages.push(OpenAiMessage {
            role: "system".to_owned(),
            content: Some(OpenAiContent::Text(system.clone())),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    messages.extend(plan.messages.iter().map(internal_message_to_openai));

    let tools = (!plan.tools.is_empty()).then(|| {
        plan.tools
            .iter()
            .map(|tool| OpenAiTool {
                tool_type: "function".to_owned(),
                function: OpenAiFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    });

    let (reasoning_effort, reasoning) = match plan.reasoning_input {
        ReasoningInput::OpenAiEffort => (reasoning_effort(plan.reasoning), None),
        ReasoningInput::OpenRouterReasoning => (None, openrouter_reasoning(plan)),
        _ => (None, None),
    };

    let mut request = OpenAiRequest {
        model: plan.model.clone(),
        messages,
        stream: true,
        tools,
        reasoning_effort,
        reasoning,
        extra: serde_json::Map::new(),
    };
    request.extra = unclaimed_extras(&request, &plan.extra);
    request
}

/// `OpenRouter` takes either a token budget or an effort level
fn openrouter_reasoning(plan: &ChatPlan) -> Option<serde_json::Value> {
    match plan.reasoning {
        ReasoningSelection::Off => None,
        ReasoningSelection::Effort(effort) => Some(serde_json::json!({ "effort": effort })),
        budget => reasoning_budget(budget).map(|tokens| serde_json::json!({ "max_tokens": tokens })),
    }
}

/// Convert a canonical message to `OpenAI` wire format
fn internal_message_to_openai(msg: &Message) -> OpenAiMessage {
    match msg.role {
        Role::Tool => OpenAiMessage {
            role: "tool".to_owned(),
            content: Some(OpenAiContent::Text(msg.content.as_text())),
            tool_calls: None,
            tool_call_id: msg.tool_call_id.clone(),
        },
        Role::Assistant => {
            let tool_calls = msg.tool_call.as_ref().map(|call| {
                vec![OpenAiToolCall {
                    id: call.id.clone(),
                    tool_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: call.name.clone(),
                        arguments: serde_json::Value::Object(call.params.clone()).to_string(),
                    },
                }]
            });
            let text = msg.content.as_text();
            OpenAiMessage {
                role: "assistant".to_owned(),
                // An assistant turn that only called a tool has no content
                content: (!text.is_empty() || tool_calls.is_none()).then_some(OpenAiContent::Text(text)),
                tool_calls,
                tool_call_id: None,
            }
        }
        Role::User => OpenAiMessage {
            role: "user".to_owned(),
            content: Some(internal_content_to_openai(&msg.content)),
            tool_calls: None,
            tool_call_id: None,
        },
    }
}

fn internal_content_to_openai(content: &Content) -> OpenAiContent {
    match content {
        Content::Text(text) => OpenAiContent::Text(text.clone()),
        Content::Parts(parts) => OpenAiContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => OpenAiContentPart::Text { text: text.clone() },
                    ContentPart::Image { url } => OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl { url: url.clone() },
                    },
                })
                .collect(),
        ),
    }
}

/// Build the non-streaming fill-in-middle request
pub fn build_fim_request(model: &str, request: &FimRequest) -> OpenAiCompletionRequest {
    OpenAiCompletionRequest {
        model: model.to_owned(),
        prompt: request.prefix.clone(),
        suffix: request.suffix.clone(),
        max_tokens: FIM_MAX_TOKENS,
        stop: request.stop.clone(),
        stream: false,
    }
}

// -- Stream conversion --

/// Decoder for chat-completions SSE chunks
///
/// Only the tool call at index 0 is tracked; later indices are discarded.
#[derive(Debug)]
pub struct OpenAiDecoder {
    provider: ProviderName,
    reasoning_field: Option<String>,
}

impl OpenAiDecoder {
    pub const fn new(provider: ProviderName, reasoning_field: Option<String>) -> Self {
        Self {
            provider,
            reasoning_field,
        }
    }
}

impl StreamDecoder for OpenAiDecoder {
    type Chunk = OpenAiStreamChunk;

    fn decode(&mut self, chunk: OpenAiStreamChunk, acc: &mut Accumulator) -> Result<Step, LlmError> {
        if let Some(error) = &chunk.error {
            return Err(classify_in_stream(self.provider, error));
        }

        let before = acc.progress();

        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            let delta = choice.delta;

            if let Some(content) = &delta.content {
                acc.text.push_str(content);
            }

            if let Some(field) = &self.reasoning_field
                && let Some(reasoning) = delta.extra.get(field).and_then(serde_json::Value::as_str)
            {
                acc.reasoning.push_str(reasoning);
            }

            for call in delta.tool_calls.unwrap_or_default() {
                if call.index != 0 {
                    tracing::debug!(provider = %self.provider, index = call.index, "ignoring parallel tool call");
                    continue;
                }
                if let Some(id) = &call.id {
                    acc.tool_id.push_str(id);
                }
                if let Some(function) = call.function {
                    if let Some(name) = &function.name {
                        acc.tool_name.push_str(name);
                    }
                    if let Some(arguments) = &function.arguments {
                        acc.tool_params.push_str(arguments);
                    }
                }
            }
        }

        Ok(if acc.progress() == before { Step::Unchanged } else { Step::Changed })
    }
}
