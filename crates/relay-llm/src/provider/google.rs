//! Gemini API transport

use futures_util::Stream;
use futures_util::future::BoxFuture;
use secrecy::ExposeSecret;

use super::{ProviderContext, credentials, fail, http as transport};
use crate::convert::google::{GoogleDecoder, build_request};
use crate::convert::{ChatPlan, drive};
use crate::error::LlmError;
use crate::protocol::google::GoogleStreamChunk;
use crate::sink::ChatSink;

pub(super) fn send_chat<'a>(
    ctx: &'a ProviderContext<'a>,
    plan: ChatPlan,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        match open_stream(ctx, &plan).await {
            Ok(chunks) => drive(GoogleDecoder::new(ctx.provider), chunks, sink, &ctx.abort).await,
            Err(e) => fail(sink, &ctx.abort, e),
        }
    })
}

fn stream_url(base: &str, model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    transport::join(base, &format!("models/{model}:streamGenerateContent?alt=sse"))
}

async fn open_stream(
    ctx: &ProviderContext<'_>,
    plan: &ChatPlan,
) -> Result<impl Stream<Item = Result<GoogleStreamChunk, LlmError>> + Send, LlmError> {
    let api_key = credentials::api_key(ctx.provider, ctx.settings, ctx.allow_env_credentials)?;
    let url = stream_url(&ctx.endpoint()?, &plan.model);
    let client = transport::client()?;

    let body = build_request(plan);
    let builder = client
        .post(url)
        .header("x-goog-api-key", api_key.expose_secret())
        .json(&body);
    let response = transport::send(ctx.provider, builder, &ctx.abort).await?;

    Ok(transport::sse_json(ctx.provider, response))
}
