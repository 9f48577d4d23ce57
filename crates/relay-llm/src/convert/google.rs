//! Conversion between canonical types and the Gemini wire format

use relay_config::ProviderName;

use super::{ChatPlan, Step, StreamDecoder, reasoning_budget, unclaimed_extras};
use crate::accumulator::Accumulator;
use crate::capabilities::ReasoningInput;
use crate::error::{LlmError, classify_in_stream};
use crate::protocol::google::{
    GoogleContent, GoogleFunctionCall, GoogleFunctionDeclaration, GoogleFunctionResponse, GoogleGenerationConfig,
    GoogleInlineData, GooglePart, GoogleRequest, GoogleStreamChunk, GoogleThinkingConfig, GoogleTool,
};
use crate::types::{Content, ContentPart, Message, Role};

// -- Outbound: canonical request -> Gemini wire format --

/// Build the `streamGenerateContent` request
pub fn build_request(plan: &ChatPlan) -> GoogleRequest {
    let contents = plan.messages.iter().map(internal_message_to_google).collect();

    let system_instruction = plan.system.as_ref().map(|system| GoogleContent {
        role: None,
        parts: vec![GooglePart::text(system.clone())],
    });

    let tools = (!plan.tools.is_empty()).then(|| {
        vec![GoogleTool {
            function_declarations: plan
                .tools
                .iter()
                .map(|tool| GoogleFunctionDeclaration {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters_schema(),
                })
                .collect(),
        }]
    });

    let thinking_config = match plan.reasoning_input {
        ReasoningInput::GeminiThinkingConfig => {
            reasoning_budget(plan.reasoning).map(|thinking_budget| GoogleThinkingConfig {
                thinking_budget,
                include_thoughts: true,
            })
        }
        _ => None,
    };

    let generation_config = (thinking_config.is_some() || plan.max_tokens.is_some()).then(|| GoogleGenerationConfig {
        max_output_tokens: plan.max_tokens,
        thinking_config,
    });

    let mut request = GoogleRequest {
        contents,
        system_instruction,
        generation_config,
        tools,
        extra: serde_json::Map::new(),
    };
    request.extra = unclaimed_extras(&request, &plan.extra);
    request
}

fn internal_message_to_google(msg: &Message) -> GoogleContent {
    match msg.role {
        Role::Tool => GoogleContent {
            role: Some("user".to_owned()),
            parts: vec![GooglePart {
                function_response: Some(GoogleFunctionResponse {
                    id: msg.tool_call_id.clone(),
                    name: msg.name.clone().unwrap_or_default(),
                    response: serde_json::json!({ "output": msg.content.as_text() }),
                }),
                ..GooglePart::default()
            }],
        },
        Role::Assistant => {
            let mut parts = content_parts(&msg.content);
            if let Some(call) = &msg.tool_call {
                parts.push(GooglePart {
                    function_call: Some(GoogleFunctionCall {
                        id: Some(call.id.clone()),
                        name: call.name.clone(),
                        args: serde_json::Value::Object(call.params.clone()),
                    }),
                    ..GooglePart::default()
                });
            }
            GoogleContent {
                role: Some("model".to_owned()),
                parts,
            }
        }
        Role::User => GoogleContent {
            role: Some("user".to_owned()),
            parts: content_parts(&msg.content),
        },
    }
}

fn content_parts(content: &Content) -> Vec<GooglePart> {
    match content {
        Content::Text(text) if text.is_empty() => Vec::new(),
        Content::Text(text) => vec![GooglePart::text(text.clone())],
        Content::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => GooglePart::text(text.clone()),
                ContentPart::Image { url } => match ContentPart::data_uri(url) {
                    Some((mime_type, data)) => GooglePart {
                        inline_data: Some(GoogleInlineData {
                            mime_type: mime_type.to_owned(),
                            data: data.to_owned(),
                        }),
                        ..GooglePart::default()
                    },
                    // Gemini only takes inline images; pass the reference as text
                    None => GooglePart::text(url.clone()),
                },
            })
            .collect(),
    }
}

// -- Stream conversion --

/// Decoder for Gemini SSE chunks
///
/// Function calls arrive whole, so no argument accumulation happens across
/// chunks; only the first call of a turn is surfaced.
#[derive(Debug)]
pub struct GoogleDecoder {
    provider: ProviderName,
}

impl GoogleDecoder {
    pub const fn new(provider: ProviderName) -> Self {
        Self { provider }
    }
}

impl StreamDecoder for GoogleDecoder {
    type Chunk = GoogleStreamChunk;

    fn decode(&mut self, chunk: GoogleStreamChunk, acc: &mut Accumulator) -> Result<Step, LlmError> {
        if let Some(error) = &chunk.error {
            return Err(classify_in_stream(self.provider, &serde_json::json!({ "error": error })));
        }

        let before = acc.progress();

        let parts = chunk
            .candidates
            .into_iter()
            .next()
            .map(|candidate| candidate.content.parts)
            .unwrap_or_default();

        for part in parts {
            if let Some(text) = &part.text {
                if part.thought == Some(true) {
                    acc.reasoning.push_str(text);
                } else {
                    acc.text.push_str(text);
                }
            }

            if let Some(call) = part.function_call {
                if !acc.tool_name.is_empty() {
                    tracing::debug!(provider = %self.provider, tool = %call.name, "ignoring additional function call");
                    continue;
                }
                acc.tool_id = call
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                acc.tool_name = call.name;
                acc.tool_params = match call.args {
                    serde_json::Value::Null => "{}".to_owned(),
                    args => args.to_string(),
                };
            }
        }

        Ok(if acc.progress() == before { Step::Unchanged } else { Step::Changed })
    }
}
