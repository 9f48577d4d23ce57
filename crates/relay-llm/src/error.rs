use http::StatusCode;
use relay_config::ProviderName;
use thiserror::Error;

/// Boxed underlying cause of a failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced through `on_error`
///
/// User cancellation is deliberately absent: it resolves as an empty final
/// message instead.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing endpoint, credential or other setting, detected before any network call
    #[error("{0}")]
    Config(String),

    /// Provider rejected the credential
    #[error("Invalid {title} API key.")]
    InvalidCredential {
        /// Display title of the provider whose key must be fixed
        title: &'static str,
        #[source]
        source: Option<BoxError>,
    },

    /// Provider is throttling requests
    #[error("Rate limit reached for {title}. {message}")]
    RateLimited {
        /// Display title of the provider
        title: &'static str,
        /// Provider's own explanation, if any
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Operation not offered by the provider or model
    #[error("{0}")]
    Unsupported(String),

    /// Stream completed without text, reasoning or a tool call
    #[error("Response from model was empty.")]
    EmptyResponse,

    /// Anything else: connection failures, unexpected statuses, undecodable payloads
    #[error("{message}")]
    Transport {
        /// Short human-readable summary
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

/// Coarse classification of an [`LlmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    InvalidCredential,
    RateLimited,
    Unsupported,
    EmptyResponse,
    Transport,
}

impl LlmError {
    /// Which branch of the taxonomy this error belongs to
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidCredential { .. } => ErrorKind::InvalidCredential,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }

    pub(crate) fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Non-success HTTP status returned by a provider, kept as the error cause
#[derive(Debug, Error)]
#[error("provider returned {status}: {body}")]
pub struct UpstreamStatus {
    pub status: StatusCode,
    pub body: String,
}

/// Error object a provider sent inside an otherwise successful stream
#[derive(Debug, Error)]
#[error("provider reported an error mid-stream: {body}")]
pub struct InStreamError {
    pub body: String,
}

/// Classify an error object received inside the stream
pub(crate) fn classify_in_stream(provider: ProviderName, payload: &serde_json::Value) -> LlmError {
    let body = payload.to_string();
    let summary = error_summary(&body).unwrap_or_else(|| "provider reported an error".to_owned());
    classify_message(provider, summary, Box::new(InStreamError { body }))
}

/// Classify a non-success HTTP response
pub(crate) fn classify_status(provider: ProviderName, status: StatusCode, body: String) -> LlmError {
    let summary = error_summary(&body).unwrap_or_else(|| status.to_string());
    let cause = UpstreamStatus { status, body };

    match status {
        StatusCode::UNAUTHORIZED => LlmError::InvalidCredential {
            title: provider.title(),
            source: Some(Box::new(cause)),
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            title: provider.title(),
            message: summary,
            source: Some(Box::new(cause)),
        },
        _ => classify_message(provider, summary, Box::new(cause)),
    }
}

/// Whether `code` appears as a standalone token, so `429` matches but `4290` does not
fn mentions_status(message: &str, code: &str) -> bool {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == code)
}

/// Classify a failure known only by its message
///
/// Some providers signal credential and quota problems with a 400 or an
/// in-stream error event, so the text is inspected as a fallback.
pub(crate) fn classify_message(provider: ProviderName, message: String, source: BoxError) -> LlmError {
    let lowered = message.to_lowercase();

    if lowered.contains("api key not valid")
        || lowered.contains("invalid api key")
        || lowered.contains("invalid x-api-key")
        || lowered.contains("incorrect api key")
    {
        return LlmError::InvalidCredential {
            title: provider.title(),
            source: Some(source),
        };
    }

    if mentions_status(&lowered, "429") || lowered.contains("rate limit") || lowered.contains("resource_exhausted") {
        return LlmError::RateLimited {
            title: provider.title(),
            message,
            source: Some(source),
        };
    }

    LlmError::Transport {
        message,
        source: Some(source),
    }
}

/// Classify a failed `reqwest` call
pub(crate) fn classify_request(provider: ProviderName, error: reqwest::Error) -> LlmError {
    if let Some(status) = error.status() {
        return classify_status(provider, status, error.to_string());
    }
    let message = format!("request to {} failed: {error}", provider.title());
    classify_message(provider, message, Box::new(error))
}

/// Pull a one-line summary out of a provider error body
///
/// Handles `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ..}` and
/// `[{"error": ..}]` (Gemini) shapes; anything else is returned trimmed.
pub(crate) fn error_summary(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_owned());
    };
    let value = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };

    let summary = value
        .pointer("/error/message")
        .and_then(serde_json::Value::as_str)
        .or_else(|| value.get("error").and_then(serde_json::Value::as_str))
        .or_else(|| value.get("message").and_then(serde_json::Value::as_str))
        .map_or_else(|| trimmed.to_owned(), |s| s.split_whitespace().collect::<Vec<_>>().join(" "));

    Some(summary)
}
