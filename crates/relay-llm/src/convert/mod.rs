//! Conversion between canonical types and each provider family's wire format
//!
//! Every submodule has an outbound half (request builder) and a stream half
//! (a [`StreamDecoder`] state machine fed one native chunk at a time).

pub mod anthropic;
pub mod google;
pub mod ollama;
pub mod openai;

use std::pin::pin;

use futures_util::{Stream, StreamExt};
use relay_config::ProviderName;
use serde::Serialize;

use crate::abort::AbortHandle;
use crate::accumulator::Accumulator;
use crate::capabilities::ReasoningInput;
use crate::error::LlmError;
use crate::sink::ChatSink;
use crate::types::{FinalMessage, InternalToolDescriptor, Message, ReasoningEffort, ReasoningSelection};

/// Chat request after model and capability resolution
///
/// This is what the request builders consume: the model name is the one sent
/// upstream, `tools` only holds tools to declare natively, and `reasoning` is
/// already `Off` when the model cannot reason.
#[derive(Debug, Clone)]
pub struct ChatPlan {
    pub provider: ProviderName,
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<InternalToolDescriptor>,
    pub reasoning: ReasoningSelection,
    pub reasoning_input: ReasoningInput,
    /// Delta field carrying reasoning on the chat-completions wire
    pub reasoning_field: Option<String>,
    pub max_tokens: Option<u32>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatPlan {
    /// Plan with no tools, reasoning or extras
    pub fn new(provider: ProviderName, model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            provider,
            model: model.into(),
            system: None,
            messages,
            tools: Vec::new(),
            reasoning: ReasoningSelection::Off,
            reasoning_input: ReasoningInput::None,
            reasoning_field: None,
            max_tokens: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Payload extras for the fields `request` leaves unset
///
/// `request` must be serialized with its own extras empty. Typed fields win;
/// a colliding extra is dropped.
pub(crate) fn unclaimed_extras<T: Serialize>(
    request: &T,
    extra: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    if extra.is_empty() {
        return serde_json::Map::new();
    }
    let claimed = match serde_json::to_value(request) {
        Ok(serde_json::Value::Object(fields)) => fields,
        _ => serde_json::Map::new(),
    };
    extra
        .iter()
        .filter(|(key, _)| {
            let taken = claimed.contains_key(key.as_str());
            if taken {
                tracing::debug!(field = %key, "payload extra shadowed by request field");
            }
            !taken
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Token budget implied by a reasoning selection
pub(crate) const fn reasoning_budget(selection: ReasoningSelection) -> Option<u32> {
    match selection {
        ReasoningSelection::Off => None,
        ReasoningSelection::Budget(tokens) => Some(tokens),
        ReasoningSelection::Effort(ReasoningEffort::Low) => Some(1024),
        ReasoningSelection::Effort(ReasoningEffort::Medium) => Some(8192),
        ReasoningSelection::Effort(ReasoningEffort::High) => Some(24_576),
    }
}

/// Effort level implied by a reasoning selection
pub(crate) const fn reasoning_effort(selection: ReasoningSelection) -> Option<ReasoningEffort> {
    match selection {
        ReasoningSelection::Off => None,
        ReasoningSelection::Effort(effort) => Some(effort),
        ReasoningSelection::Budget(tokens) if tokens <= 2048 => Some(ReasoningEffort::Low),
        ReasoningSelection::Budget(tokens) if tokens <= 16_384 => Some(ReasoningEffort::Medium),
        ReasoningSelection::Budget(_) => Some(ReasoningEffort::High),
    }
}

/// Outcome of decoding one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing visible changed
    Unchanged,
    /// Text, reasoning or tool call changed; emit a snapshot
    Changed,
    /// The provider signalled the end of the stream
    Finished,
}

/// Per-family streaming state machine
pub trait StreamDecoder {
    /// Native chunk type
    type Chunk;

    /// Fold one chunk into the accumulator
    ///
    /// # Errors
    ///
    /// Returns an error when the chunk itself reports a failure.
    fn decode(&mut self, chunk: Self::Chunk, acc: &mut Accumulator) -> Result<Step, LlmError>;

    /// Build the terminal message once the stream has ended
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EmptyResponse`] when nothing was produced.
    fn finish(self, acc: Accumulator) -> Result<FinalMessage, LlmError>
    where
        Self: Sized,
    {
        acc.finish(None)
    }
}

/// Pump `chunks` through `decoder` into `sink` until the stream ends or is aborted
///
/// Each chunk is decoded and emitted without suspending, so emissions keep
/// the order the chunks arrived in.
pub async fn drive<D, S>(mut decoder: D, chunks: S, sink: &mut dyn ChatSink, abort: &AbortHandle)
where
    D: StreamDecoder,
    S: Stream<Item = Result<D::Chunk, LlmError>>,
{
    let mut chunks = pin!(chunks);
    let mut acc = Accumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            () = abort.aborted() => {
                sink.on_final_message(FinalMessage::empty());
                return;
            }
            next = chunks.next() => next,
        };

        match next {
            None => break,
            Some(Err(e)) => {
                sink.on_error(e);
                return;
            }
            Some(Ok(chunk)) => {
                let before = acc.progress();
                match decoder.decode(chunk, &mut acc) {
                    Ok(Step::Changed) => sink.on_text(&acc.snapshot()),
                    Ok(Step::Unchanged) => {}
                    Ok(Step::Finished) => {
                        // The terminal chunk may carry content of its own
                        if acc.progress() != before {
                            sink.on_text(&acc.snapshot());
                        }
                        break;
                    }
                    Err(e) => {
                        sink.on_error(e);
                        return;
                    }
                }
            }
        }
    }

    match decoder.finish(acc) {
        Ok(message) => sink.on_final_message(message),
        Err(e) => sink.on_error(e),
    }
}
