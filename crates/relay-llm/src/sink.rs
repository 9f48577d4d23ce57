//! Callbacks that receive the output of a request

use tokio::sync::mpsc;

use crate::abort::AbortHandle;
use crate::error::LlmError;
use crate::types::{FinalMessage, IncrementalDelta};

/// Receiver of one request's output
///
/// A request produces any number of `on_text` calls followed by exactly one
/// terminal call, either `on_final_message` or `on_error`.
pub trait ChatSink: Send {
    /// Cumulative snapshot of everything received so far
    fn on_text(&mut self, delta: &IncrementalDelta);

    /// Request completed (or was cancelled)
    fn on_final_message(&mut self, message: FinalMessage);

    /// Request failed
    fn on_error(&mut self, error: LlmError);
}

impl<S: ChatSink + ?Sized> ChatSink for &mut S {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        (**self).on_text(delta);
    }

    fn on_final_message(&mut self, message: FinalMessage) {
        (**self).on_final_message(message);
    }

    fn on_error(&mut self, error: LlmError) {
        (**self).on_error(error);
    }
}

impl<S: ChatSink + ?Sized> ChatSink for Box<S> {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        (**self).on_text(delta);
    }

    fn on_final_message(&mut self, message: FinalMessage) {
        (**self).on_final_message(message);
    }

    fn on_error(&mut self, error: LlmError) {
        (**self).on_error(error);
    }
}

/// Sink built from three closures
pub struct Callbacks<T, F, E> {
    pub on_text: T,
    pub on_final_message: F,
    pub on_error: E,
}

impl<T, F, E> ChatSink for Callbacks<T, F, E>
where
    T: FnMut(&IncrementalDelta) + Send,
    F: FnMut(FinalMessage) + Send,
    E: FnMut(LlmError) + Send,
{
    fn on_text(&mut self, delta: &IncrementalDelta) {
        (self.on_text)(delta);
    }

    fn on_final_message(&mut self, message: FinalMessage) {
        (self.on_final_message)(message);
    }

    fn on_error(&mut self, error: LlmError) {
        (self.on_error)(error);
    }
}

/// Event forwarded by [`ChannelSink`]
#[derive(Debug)]
pub enum ChatEvent {
    Text(IncrementalDelta),
    Final(FinalMessage),
    Error(LlmError),
}

/// Sink that forwards every callback over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

/// Create a channel-backed sink and the receiving end
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<ChatEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

impl ChannelSink {
    fn send(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("chat event receiver dropped");
        }
    }
}

impl ChatSink for ChannelSink {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        self.send(ChatEvent::Text(delta.clone()));
    }

    fn on_final_message(&mut self, message: FinalMessage) {
        self.send(ChatEvent::Final(message));
    }

    fn on_error(&mut self, error: LlmError) {
        self.send(ChatEvent::Error(error));
    }
}

/// Outermost layer around the caller's sink
///
/// Lets exactly one terminal callback through, drops text after it, and turns
/// anything that arrives after an abort into a single empty final message.
pub(crate) struct Guarded<S> {
    inner: S,
    abort: AbortHandle,
    finished: bool,
}

impl<S: ChatSink> Guarded<S> {
    pub(crate) const fn new(inner: S, abort: AbortHandle) -> Self {
        Self {
            inner,
            abort,
            finished: false,
        }
    }

    pub(crate) const fn is_finished(&self) -> bool {
        self.finished
    }

    fn cancelled(&mut self) {
        self.finished = true;
        self.inner.on_final_message(FinalMessage::empty());
    }
}

impl<S: ChatSink> ChatSink for Guarded<S> {
    fn on_text(&mut self, delta: &IncrementalDelta) {
        if self.finished || self.abort.is_aborted() {
            return;
        }
        self.inner.on_text(delta);
    }

    fn on_final_message(&mut self, message: FinalMessage) {
        if self.finished {
            return;
        }
        if self.abort.is_aborted() {
            self.cancelled();
            return;
        }
        self.finished = true;
        self.inner.on_final_message(message);
    }

    fn on_error(&mut self, error: LlmError) {
        if self.finished {
            tracing::debug!(error = %error, "error after terminal callback dropped");
            return;
        }
        if self.abort.is_aborted() {
            tracing::debug!(error = %error, "error suppressed after abort");
            self.cancelled();
            return;
        }
        self.finished = true;
        self.inner.on_error(error);
    }
}
