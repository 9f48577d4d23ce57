//! Terminal rendering of streamed output

use std::io::Write;

use relay_llm::{ChatSink, FinalMessage, IncrementalDelta, LlmError};

/// Prints the new part of each cumulative snapshot as it arrives
///
/// Answer text goes to stdout, reasoning to stderr.
#[derive(Debug, Default)]
pub struct TerminalSink {
    printed_text: usize,
    printed_reasoning: usize,
    outcome: Option<Result<FinalMessage, LlmError>>,
}

/// Suffix of `full` past what was already printed
fn unseen(full: &str, printed: usize) -> &str {
    full.get(printed..).unwrap_or_default()
}

impl TerminalSink {
    fn catch_up(&mut self, text: &str, reasoning: &str) {
        let fresh = unseen(reasoning, self.printed_reasoning);
        if !fresh.is_empty() {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "{fresh}");
            let _ = err.flush();
            self.printed_reasoning = reasoning.len();
        }

        let fresh = unseen(text, self.printed_text);
        if !fresh.is_empty() {
            let mut out = std::io::stdout().lock();
            let _ = write!(out, "{fresh}");
            let _ = out.flush();
            self.printed_text = text.len();
        }
    }

    /// Print the remainder and any tool call, or return the failure
    pub fn finish(self) -> anyhow::Result<()> {
        match self.outcome {
            Some(Ok(message)) => {
                if let Some(call) = &message.tool_call {
                    println!();
                    println!("{}", serde_json::to_string_pretty(call)?);
                } else if !message.full_text.is_empty() {
                    println!();
                }
                Ok(())
            }
            Some(Err(e)) => Err(anyhow::Error::new(e)),
            None => anyhow::bail!("request ended without a result"),
        }
    }
}

impl ChatSink for TerminalSink {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        self.catch_up(&delta.full_text, &delta.full_reasoning);
    }

    fn on_final_message(&mut self, message: FinalMessage) {
        self.catch_up(&message.full_text, &message.full_reasoning);
        self.outcome = Some(Ok(message));
    }

    fn on_error(&mut self, error: LlmError) {
        self.outcome = Some(Err(error));
    }
}
