//! Remote task-decomposition service
//!
//! The conversation is flattened into one prompt, split into subtasks by the
//! service, and each subtask's output is relayed as it completes.

use futures_util::future::BoxFuture;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::{ProviderContext, credentials, fail, http as transport};
use crate::convert::ChatPlan;
use crate::error::LlmError;
use crate::protocol::division::{DecomposeRequest, DecomposeResponse, GenerateRequest, GenerateResponse};
use crate::sink::ChatSink;
use crate::types::{FinalMessage, IncrementalDelta, Message, Role};

/// Separator between the outputs of successive subtasks
const TASK_SEPARATOR: &str = "\n\n";

/// Render the history as a single prompt
fn flatten(system: Option<&str>, messages: &[Message]) -> String {
    let mut sections = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = system {
        sections.push(format!("System: {system}"));
    }
    for msg in messages {
        let speaker = match msg.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Tool => "Tool result",
        };
        sections.push(format!("{speaker}: {}", msg.content.as_text()));
    }
    sections.join("\n\n")
}

async fn post<B, R>(
    ctx: &ProviderContext<'_>,
    client: &Client,
    key: &SecretString,
    url: String,
    body: &B,
) -> Result<R, LlmError>
where
    B: serde::Serialize + Sync,
    R: serde::de::DeserializeOwned,
{
    let builder = client.post(url).bearer_auth(key.expose_secret()).json(body);
    let response = transport::send(ctx.provider, builder, &ctx.abort).await?;
    transport::json(ctx.provider, response).await
}

pub(super) fn send_chat<'a>(
    ctx: &'a ProviderContext<'a>,
    plan: ChatPlan,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        match run(ctx, &plan, sink).await {
            Ok(Some(message)) => sink.on_final_message(message),
            Ok(None) => sink.on_final_message(FinalMessage::empty()),
            Err(e) => fail(sink, &ctx.abort, e),
        }
    })
}

/// Returns `None` when aborted between subtasks
async fn run(
    ctx: &ProviderContext<'_>,
    plan: &ChatPlan,
    sink: &mut dyn ChatSink,
) -> Result<Option<FinalMessage>, LlmError> {
    let key = credentials::api_key(ctx.provider, ctx.settings, ctx.allow_env_credentials)?;
    let base = ctx.endpoint()?;
    let client = transport::client()?;
    let prompt = flatten(plan.system.as_deref(), &plan.messages);

    let decomposed: DecomposeResponse = post(
        ctx,
        &client,
        &key,
        transport::join(&base, "decompose"),
        &DecomposeRequest {
            prompt: prompt.clone(),
            model: plan.model.clone(),
        },
    )
    .await?;
    tracing::debug!(provider = %ctx.provider, tasks = decomposed.tasks.len(), "request decomposed");

    let mut full_text = String::new();
    for task in decomposed.tasks {
        if ctx.abort.is_aborted() {
            return Ok(None);
        }

        let generated: GenerateResponse = post(
            ctx,
            &client,
            &key,
            transport::join(&base, "generate"),
            &GenerateRequest {
                prompt: prompt.clone(),
                model: plan.model.clone(),
                task,
            },
        )
        .await?;

        if generated.output.is_empty() {
            continue;
        }
        if !full_text.is_empty() {
            full_text.push_str(TASK_SEPARATOR);
        }
        full_text.push_str(&generated.output);
        sink.on_text(&IncrementalDelta {
            full_text: full_text.clone(),
            ..IncrementalDelta::default()
        });
    }

    if ctx.abort.is_aborted() {
        return Ok(None);
    }
    if full_text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(Some(FinalMessage::text(full_text)))
}
