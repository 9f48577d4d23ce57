//! Request plumbing shared by every provider

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt, future, stream};
use relay_config::ProviderName;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::abort::AbortHandle;
use crate::error::{LlmError, classify_request, classify_status};

/// Build the HTTP client for one request
pub(crate) fn client() -> Result<Client, LlmError> {
    Client::builder()
        .build()
        .map_err(|e| LlmError::transport("failed to build HTTP client", e))
}

/// Issue a request, racing it against the abort handle
///
/// A non-success status is classified from the response body. An abort before
/// the response arrives drops the connection attempt and yields a transport
/// error, which the guarded sink turns into an empty final message.
pub(crate) async fn send(
    provider: ProviderName,
    builder: RequestBuilder,
    abort: &AbortHandle,
) -> Result<Response, LlmError> {
    let response = tokio::select! {
        biased;
        () = abort.aborted() => {
            return Err(LlmError::Transport {
                message: "request aborted".to_owned(),
                source: None,
            });
        }
        result = builder.send() => result.map_err(|e| {
            tracing::error!(provider = %provider, error = %e, "upstream request failed");
            classify_request(provider, e)
        })?,
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider = %provider, status = %status, "upstream returned error");
        return Err(classify_status(provider, status, body));
    }

    Ok(response)
}

/// Read a whole JSON response body
pub(crate) async fn json<T: DeserializeOwned>(provider: ProviderName, response: Response) -> Result<T, LlmError> {
    response
        .json()
        .await
        .map_err(|e| LlmError::transport(format!("failed to parse {} response", provider.title()), e))
}

/// Server-sent events whose `data` field is one JSON chunk
///
/// Empty events, the `[DONE]` sentinel and chunks that fail to parse are
/// skipped.
pub(crate) fn sse_json<T>(provider: ProviderName, response: Response) -> impl Stream<Item = Result<T, LlmError>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    response.bytes_stream().eventsource().filter_map(move |event| {
        let item = match event {
            Ok(event) => parse_chunk(provider, &event.data),
            Err(e) => Some(Err(LlmError::transport(
                format!("stream from {} was interrupted", provider.title()),
                e,
            ))),
        };
        future::ready(item)
    })
}

/// Newline-delimited JSON, one chunk per line
pub(crate) fn ndjson<T>(provider: ProviderName, response: Response) -> impl Stream<Item = Result<T, LlmError>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let bytes = response.bytes_stream().boxed();

    stream::unfold((bytes, Vec::new(), false), move |(mut bytes, mut buffer, mut eof)| async move {
        loop {
            if let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                if let Some(item) = parse_chunk(provider, &String::from_utf8_lossy(&line)) {
                    return Some((item, (bytes, buffer, eof)));
                }
                continue;
            }

            if eof {
                let rest = std::mem::take(&mut buffer);
                return parse_chunk(provider, &String::from_utf8_lossy(&rest)).map(|item| (item, (bytes, buffer, eof)));
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    let error = LlmError::transport(format!("stream from {} was interrupted", provider.title()), e);
                    buffer.clear();
                    return Some((Err(error), (bytes, buffer, true)));
                }
                None => eof = true,
            }
        }
    })
}

fn parse_chunk<T: DeserializeOwned>(provider: ProviderName, data: &str) -> Option<Result<T, LlmError>> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str(data) {
        Ok(chunk) => Some(Ok(chunk)),
        Err(e) => {
            tracing::debug!(provider = %provider, error = %e, "skipping unparseable stream chunk");
            None
        }
    }
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
