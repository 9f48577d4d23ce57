//! Sink decorators that recover reasoning and tool calls from plain text
//!
//! Each wrapper is itself a [`ChatSink`](crate::ChatSink) around the next
//! one, so decoders never know whether they are installed.

mod reasoning;
mod xml_tools;

pub use reasoning::{ReasoningTagExtractor, split_reasoning};
pub use xml_tools::{XmlToolCallExtractor, parse_xml_tool_call, xml_tools_system_section};

/// Drop the longest suffix of `text` that is a proper prefix of `delimiter`
///
/// Used while streaming so that half a delimiter never flashes up as text.
fn withhold_partial<'a>(text: &'a str, delimiter: &str) -> &'a str {
    let longest = delimiter.len().saturating_sub(1).min(text.len());
    for len in (1..=longest).rev() {
        let cut = text.len() - len;
        if text.is_char_boundary(cut) && delimiter.starts_with(&text[cut..]) {
            return &text[..cut];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withholds_only_a_delimiter_prefix() {
        assert_eq!(withhold_partial("hello <thi", "<think>"), "hello ");
        assert_eq!(withhold_partial("hello <", "<think>"), "hello ");
        assert_eq!(withhold_partial("hello <a", "<think>"), "hello <a");
        assert_eq!(withhold_partial("hello", "<think>"), "hello");
        // A complete delimiter is not a proper prefix
        assert_eq!(withhold_partial("x<think>", "<think>"), "x<think>");
        assert_eq!(withhold_partial("héllo", "<think>"), "héllo");
    }
}
