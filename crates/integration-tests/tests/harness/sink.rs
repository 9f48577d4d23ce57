//! Collecting the events of one request

use relay_llm::{ChatEvent, FinalMessage, IncrementalDelta, LlmError};
use tokio::sync::mpsc::UnboundedReceiver;

/// Every callback of one finished request, in order
#[derive(Debug, Default)]
pub struct Events {
    pub texts: Vec<IncrementalDelta>,
    pub finals: Vec<FinalMessage>,
    pub errors: Vec<LlmError>,
}

impl Events {
    /// Drain whatever the request delivered
    pub fn drain(rx: &mut UnboundedReceiver<ChatEvent>) -> Self {
        let mut events = Self::default();
        while let Ok(event) = rx.try_recv() {
            match event {
                ChatEvent::Text(delta) => events.texts.push(delta),
                ChatEvent::Final(message) => events.finals.push(message),
                ChatEvent::Error(error) => events.errors.push(error),
            }
        }
        events
    }

    /// The one final message, asserting there was no error
    pub fn final_message(&self) -> &FinalMessage {
        assert!(self.errors.is_empty(), "unexpected errors: {:?}", self.errors);
        assert_eq!(self.finals.len(), 1, "expected exactly one final message");
        &self.finals[0]
    }

    /// The one error, asserting there was no final message
    pub fn error(&self) -> &LlmError {
        assert!(self.finals.is_empty(), "unexpected final message: {:?}", self.finals);
        assert_eq!(self.errors.len(), 1, "expected exactly one error");
        &self.errors[0]
    }

    pub fn full_texts(&self) -> Vec<&str> {
        self.texts.iter().map(|d| d.full_text.as_str()).collect()
    }
}
