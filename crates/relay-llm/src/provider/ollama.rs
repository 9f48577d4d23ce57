//! Ollama native API: streamed fill-in-middle and installed models

use futures_util::future::BoxFuture;

use super::{ProviderContext, fail, http as transport};
use crate::convert::drive;
use crate::convert::ollama::{OllamaFimDecoder, build_fim_request};
use crate::error::LlmError;
use crate::protocol::ollama::{OllamaGenerateChunk, OllamaTagList};
use crate::sink::ChatSink;
use crate::types::{FimRequest, ModelInfo};

/// The native API sits at the server root, not under `/v1`
fn native_base(ctx: &ProviderContext<'_>) -> Result<String, LlmError> {
    let endpoint = ctx.endpoint()?;
    Ok(endpoint.strip_suffix("/v1").unwrap_or(&endpoint).to_owned())
}

pub(super) fn send_fim<'a>(
    ctx: &'a ProviderContext<'a>,
    request: FimRequest,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let opened = async {
            let url = transport::join(&native_base(ctx)?, "api/generate");
            let client = transport::client()?;
            let builder = client.post(url).json(&build_fim_request(&request.model, &request));
            let response = transport::send(ctx.provider, builder, &ctx.abort).await?;
            Ok::<_, LlmError>(transport::ndjson::<OllamaGenerateChunk>(ctx.provider, response))
        };

        match opened.await {
            Ok(lines) => drive(OllamaFimDecoder, lines, sink, &ctx.abort).await,
            Err(e) => fail(sink, &ctx.abort, e),
        }
    })
}

pub(super) fn list_models<'a>(ctx: &'a ProviderContext<'a>) -> BoxFuture<'a, Result<Vec<ModelInfo>, LlmError>> {
    Box::pin(async move {
        let url = transport::join(&native_base(ctx)?, "api/tags");
        let client = transport::client()?;
        let response = transport::send(ctx.provider, client.get(url), &ctx.abort).await?;
        let tags: OllamaTagList = transport::json(ctx.provider, response).await?;

        let models: Vec<ModelInfo> = tags
            .models
            .into_iter()
            .map(|tag| ModelInfo {
                id: tag.name,
                owned_by: tag.details.and_then(|d| d.family),
            })
            .collect();
        tracing::debug!(provider = %ctx.provider, count = models.len(), "discovered models");

        Ok(models)
    })
}
