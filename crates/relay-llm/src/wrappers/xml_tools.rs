use std::fmt::Write as _;

use super::withhold_partial;
use crate::error::LlmError;
use crate::sink::ChatSink;
use crate::types::{FinalMessage, IncrementalDelta, InternalToolDescriptor, ToolCall};

/// Instructions appended to the system message when tools go through text
pub fn xml_tools_system_section(tools: &[InternalToolDescriptor]) -> String {
    let mut section = String::from("Available tools:\n");

    for tool in tools {
        let _ = write!(section, "\n<{name}>\nDescription: {}\n", tool.description, name = tool.name);
        if !tool.params.is_empty() {
            section.push_str("Parameters:\n");
            for (param, description) in &tool.params {
                let _ = writeln!(section, "- {param}: {description}");
            }
        }
        let _ = writeln!(section, "</{}>", tool.name);
    }

    section.push_str(
        "\nTo call a tool, write it as XML after your response text, one element per parameter, for example:\n",
    );
    if let Some(example) = tools.first() {
        let _ = writeln!(section, "<{}>", example.name);
        for param in example.params.keys() {
            let _ = writeln!(section, "<{param}>value</{param}>");
        }
        let _ = writeln!(section, "</{}>", example.name);
    }
    section.push_str("Call at most one tool per response, and stop writing once the tool call is complete.");

    section
}

/// Strip one newline on each side of a value, as models tend to add them
fn trim_value(value: &str) -> &str {
    let value = value.strip_prefix('\n').unwrap_or(value);
    value.strip_suffix('\n').unwrap_or(value)
}

/// Earliest `<name>` among `names` in `text`, as (offset, name)
fn find_open_tag<'a>(text: &str, names: impl Iterator<Item = &'a str>) -> Option<(usize, &'a str)> {
    names
        .filter_map(|name| text.find(&format!("<{name}>")).map(|at| (at, name)))
        .min_by_key(|(at, _)| *at)
}

/// Parse one tool call written as XML out of raw text
///
/// Returns the visible text (with the call region removed) and the call, if
/// one was opened. While `streaming`, a trailing partial opening tag is held
/// back; without markup the text comes back unchanged.
pub fn parse_xml_tool_call(
    raw: &str,
    tools: &[InternalToolDescriptor],
    call_id: &str,
    streaming: bool,
) -> (String, Option<ToolCall>) {
    let Some((open_at, name)) = find_open_tag(raw, tools.iter().map(|t| t.name.as_str())) else {
        let visible = if streaming {
            tools
                .iter()
                .map(|tool| withhold_partial(raw, &format!("<{}>", tool.name)))
                .min_by_key(|kept| kept.len())
                .unwrap_or(raw)
        } else {
            raw
        };
        return (visible.to_owned(), None);
    };

    let Some(tool) = tools.iter().find(|t| t.name == name) else {
        return (raw.to_owned(), None);
    };

    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let body = &raw[open_at + open.len()..];
    let (inner, after, closed) = match body.find(&close) {
        Some(end) => (&body[..end], &body[end + close.len()..], true),
        None => (body, "", false),
    };

    let mut call = ToolCall::pending(call_id, name);
    let mut rest = inner;
    while let Some((at, param)) = find_open_tag(rest, tool.params.keys().map(String::as_str)) {
        let value_start = &rest[at + param.len() + 2..];
        let param_close = format!("</{param}>");
        match value_start.find(&param_close) {
            Some(end) => {
                call.raw_params
                    .insert(param.to_owned(), trim_value(&value_start[..end]).into());
                if !call.done_params.iter().any(|p| p == param) {
                    call.done_params.push(param.to_owned());
                }
                rest = &value_start[end + param_close.len()..];
            }
            None => {
                let partial = if streaming {
                    withhold_partial(value_start, &param_close)
                } else {
                    value_start
                };
                let partial = partial.strip_prefix('\n').unwrap_or(partial);
                call.raw_params.insert(param.to_owned(), partial.into());
                if !streaming {
                    call.done_params.push(param.to_owned());
                }
                break;
            }
        }
    }
    call.is_done = closed || !streaming;

    let mut visible = raw[..open_at].to_owned();
    visible.push_str(after);
    (visible, Some(call))
}

/// Surfaces tool calls written as XML through `tool_call`
///
/// Installed only for models without native tool calling, so callers see the
/// same `tool_call` field either way.
pub struct XmlToolCallExtractor<S> {
    inner: S,
    tools: Vec<InternalToolDescriptor>,
    call_id: String,
}

impl<S: ChatSink> XmlToolCallExtractor<S> {
    pub fn new(inner: S, tools: Vec<InternalToolDescriptor>) -> Self {
        Self {
            inner,
            tools,
            call_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl<S: ChatSink> ChatSink for XmlToolCallExtractor<S> {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        let (text, call) = parse_xml_tool_call(&delta.full_text, &self.tools, &self.call_id, true);
        self.inner.on_text(&IncrementalDelta {
            full_text: text,
            full_reasoning: delta.full_reasoning.clone(),
            tool_call: call.or_else(|| delta.tool_call.clone()),
        });
    }

    fn on_final_message(&mut self, mut message: FinalMessage) {
        let (text, call) = parse_xml_tool_call(&message.full_text, &self.tools, &self.call_id, false);
        message.full_text = text;
        if call.is_some() {
            message.tool_call = call;
        }
        self.inner.on_final_message(message);
    }

    fn on_error(&mut self, error: LlmError) {
        self.inner.on_error(error);
    }
}
