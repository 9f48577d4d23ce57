//! Anthropic Messages API transport

use futures_util::Stream;
use futures_util::future::BoxFuture;
use secrecy::ExposeSecret;

use super::{ProviderContext, credentials, fail, http as transport};
use crate::convert::anthropic::{AnthropicDecoder, build_request};
use crate::convert::{ChatPlan, drive};
use crate::error::LlmError;
use crate::protocol::anthropic::AnthropicStreamEvent;
use crate::sink::ChatSink;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(super) fn send_chat<'a>(
    ctx: &'a ProviderContext<'a>,
    plan: ChatPlan,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        match open_stream(ctx, &plan).await {
            Ok(events) => drive(AnthropicDecoder::new(ctx.provider), events, sink, &ctx.abort).await,
            Err(e) => fail(sink, &ctx.abort, e),
        }
    })
}

async fn open_stream(
    ctx: &ProviderContext<'_>,
    plan: &ChatPlan,
) -> Result<impl Stream<Item = Result<AnthropicStreamEvent, LlmError>> + Send, LlmError> {
    let api_key = credentials::api_key(ctx.provider, ctx.settings, ctx.allow_env_credentials)?;
    let url = transport::join(&ctx.endpoint()?, "messages");
    let client = transport::client()?;

    let body = build_request(plan);
    let builder = client
        .post(url)
        .header("x-api-key", api_key.expose_secret())
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body);
    let response = transport::send(ctx.provider, builder, &ctx.abort).await?;

    Ok(transport::sse_json(ctx.provider, response))
}
