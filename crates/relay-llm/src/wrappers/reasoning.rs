use super::withhold_partial;
use crate::capabilities::ThinkTags;
use crate::error::LlmError;
use crate::sink::ChatSink;
use crate::types::{FinalMessage, IncrementalDelta};

/// Split inline reasoning out of raw text
///
/// Returns `(text, reasoning)`. Content between the delimiters is reasoning;
/// an unterminated block runs to the end. With `streaming` set, a trailing
/// partial delimiter is held back because the next chunk may complete it.
pub fn split_reasoning(raw: &str, tags: &ThinkTags, streaming: bool) -> (String, String) {
    let mut text = String::with_capacity(raw.len());
    let mut reasoning = String::new();
    let mut rest = raw;

    loop {
        let Some(open_at) = rest.find(&tags.open) else {
            text.push_str(if streaming { withhold_partial(rest, &tags.open) } else { rest });
            break;
        };
        text.push_str(&rest[..open_at]);
        rest = &rest[open_at + tags.open.len()..];

        let Some(close_at) = rest.find(&tags.close) else {
            reasoning.push_str(if streaming { withhold_partial(rest, &tags.close) } else { rest });
            break;
        };
        reasoning.push_str(&rest[..close_at]);
        rest = &rest[close_at + tags.close.len()..];
    }

    (text, reasoning)
}

fn merge_reasoning(upstream: &str, extracted: String) -> String {
    if upstream.is_empty() {
        extracted
    } else {
        let mut merged = upstream.to_owned();
        merged.push_str(&extracted);
        merged
    }
}

/// Routes tag-delimited reasoning in the text channel to `full_reasoning`
pub struct ReasoningTagExtractor<S> {
    inner: S,
    tags: ThinkTags,
}

impl<S: ChatSink> ReasoningTagExtractor<S> {
    pub const fn new(inner: S, tags: ThinkTags) -> Self {
        Self { inner, tags }
    }
}

impl<S: ChatSink> ChatSink for ReasoningTagExtractor<S> {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        let (text, reasoning) = split_reasoning(&delta.full_text, &self.tags, true);
        self.inner.on_text(&IncrementalDelta {
            full_text: text,
            full_reasoning: merge_reasoning(&delta.full_reasoning, reasoning),
            tool_call: delta.tool_call.clone(),
        });
    }

    fn on_final_message(&mut self, mut message: FinalMessage) {
        let (text, reasoning) = split_reasoning(&message.full_text, &self.tags, false);
        message.full_reasoning = merge_reasoning(&message.full_reasoning, reasoning);
        message.full_text = text;
        self.inner.on_final_message(message);
    }

    fn on_error(&mut self, error: LlmError) {
        self.inner.on_error(error);
    }
}
