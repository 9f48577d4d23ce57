//! Transport for the chat-completions wire family
//!
//! Most providers speak this dialect; they differ only in where the endpoint
//! lives and how the request is authenticated.

use futures_util::Stream;
use futures_util::future::BoxFuture;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use relay_config::{ProviderName, parse_headers_json};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};

use super::{ProviderContext, credentials, deliver_whole, fail, http as transport};
use crate::convert::openai::{OpenAiDecoder, build_fim_request, build_request};
use crate::convert::{ChatPlan, drive};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiCompletionResponse, OpenAiModelList, OpenAiStreamChunk};
use crate::sink::ChatSink;
use crate::types::{FimRequest, ModelInfo};

const AZURE_DEFAULT_API_VERSION: &str = "2024-10-21";
const OPENROUTER_REFERER: &str = "https://github.com/relay-dev/relay";
const OPENROUTER_TITLE: &str = "Relay";

/// How the key travels
enum Auth {
    Bearer(SecretString),
    /// Azure's `api-key` header
    ApiKeyHeader(SecretString),
}

/// Resolved endpoint and credentials for one request
struct Target {
    /// Base URL without a trailing slash
    base: String,
    auth: Auth,
    headers: HeaderMap,
    /// Complete chat URL when it does not follow `{base}/chat/completions`
    chat_url: Option<String>,
}

impl Target {
    async fn resolve(ctx: &ProviderContext<'_>, client: &Client, model: &str) -> Result<Self, LlmError> {
        let provider = ctx.provider;
        let settings = ctx.settings;
        let mut headers = HeaderMap::new();
        let mut chat_url = None;

        let (base, auth) = match provider {
            ProviderName::GoogleVertex => {
                let project = required(provider, "project", settings.project.as_deref())?;
                let region = required(provider, "region", settings.region.as_deref())?;
                let token = credentials::vertex_access_token(client).await?;
                let base = format!(
                    "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/endpoints/openapi"
                );
                (base, Auth::Bearer(token))
            }
            ProviderName::MicrosoftAzure => {
                let base = ctx.endpoint()?;
                let version = settings.api_version.as_deref().unwrap_or(AZURE_DEFAULT_API_VERSION);
                chat_url = Some(format!(
                    "{base}/openai/deployments/{model}/chat/completions?api-version={version}"
                ));
                let key = credentials::api_key(provider, settings, ctx.allow_env_credentials)?;
                (base, Auth::ApiKeyHeader(key))
            }
            ProviderName::Ollama | ProviderName::VLlm | ProviderName::LmStudio | ProviderName::LiteLlm => {
                let base = versioned(&ctx.endpoint()?);
                let key = credentials::api_key(provider, settings, ctx.allow_env_credentials)?;
                (base, Auth::Bearer(key))
            }
            ProviderName::OpenAiCompatible => {
                let base = ctx.endpoint()?;
                if let Some(raw) = &settings.headers_json {
                    headers.extend(custom_headers(raw)?);
                }
                let key = credentials::api_key(provider, settings, ctx.allow_env_credentials)?;
                (base, Auth::Bearer(key))
            }
            ProviderName::OpenRouter => {
                headers.insert("http-referer", HeaderValue::from_static(OPENROUTER_REFERER));
                headers.insert("x-title", HeaderValue::from_static(OPENROUTER_TITLE));
                let key = credentials::api_key(provider, settings, ctx.allow_env_credentials)?;
                (ctx.endpoint()?, Auth::Bearer(key))
            }
            _ => {
                let key = credentials::api_key(provider, settings, ctx.allow_env_credentials)?;
                (ctx.endpoint()?, Auth::Bearer(key))
            }
        };

        Ok(Self {
            base,
            auth,
            headers,
            chat_url,
        })
    }

    fn chat_url(&self) -> String {
        self.chat_url
            .clone()
            .unwrap_or_else(|| transport::join(&self.base, "chat/completions"))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.headers(self.headers.clone());
        match &self.auth {
            Auth::Bearer(key) => builder.bearer_auth(key.expose_secret()),
            Auth::ApiKeyHeader(key) => builder.header("api-key", key.expose_secret()),
        }
    }
}

fn required<'a>(provider: ProviderName, field: &str, value: Option<&'a str>) -> Result<&'a str, LlmError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        LlmError::config(format!(
            "{} {field} is not set. Add it in the provider settings.",
            provider.title()
        ))
    })
}

/// Local servers expose the chat-completions API under `/v1`
fn versioned(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.ends_with("/v1") {
        endpoint.to_owned()
    } else {
        format!("{endpoint}/v1")
    }
}

fn custom_headers(raw: &str) -> Result<HeaderMap, LlmError> {
    let pairs = parse_headers_json(raw).map_err(|e| LlmError::config(format!("Invalid custom headers: {e}")))?;

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| LlmError::config(format!("Invalid custom header name {name:?}: {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| LlmError::config(format!("Invalid value for custom header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

// -- Chat --

pub(super) fn send_chat<'a>(
    ctx: &'a ProviderContext<'a>,
    plan: ChatPlan,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let decoder = OpenAiDecoder::new(ctx.provider, plan.reasoning_field.clone());
        match open_chat(ctx, &plan).await {
            Ok(chunks) => drive(decoder, chunks, sink, &ctx.abort).await,
            Err(e) => fail(sink, &ctx.abort, e),
        }
    })
}

async fn open_chat(
    ctx: &ProviderContext<'_>,
    plan: &ChatPlan,
) -> Result<impl Stream<Item = Result<OpenAiStreamChunk, LlmError>> + Send, LlmError> {
    let client = transport::client()?;
    let target = Target::resolve(ctx, &client, &plan.model).await?;

    let body = build_request(plan);
    let builder = target.authorize(client.post(target.chat_url())).json(&body);
    let response = transport::send(ctx.provider, builder, &ctx.abort).await?;

    Ok(transport::sse_json(ctx.provider, response))
}

// -- Fill-in-middle --

pub(super) fn send_fim<'a>(
    ctx: &'a ProviderContext<'a>,
    request: FimRequest,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(complete_fim(ctx, request, sink, "completions"))
}

pub(super) fn send_mistral_fim<'a>(
    ctx: &'a ProviderContext<'a>,
    request: FimRequest,
    sink: &'a mut dyn ChatSink,
) -> BoxFuture<'a, ()> {
    Box::pin(complete_fim(ctx, request, sink, "fim/completions"))
}

async fn complete_fim(ctx: &ProviderContext<'_>, request: FimRequest, sink: &mut dyn ChatSink, path: &str) {
    match fetch_fim(ctx, &request, path).await {
        Ok(text) => deliver_whole(sink, &ctx.abort, text),
        Err(e) => fail(sink, &ctx.abort, e),
    }
}

async fn fetch_fim(ctx: &ProviderContext<'_>, request: &FimRequest, path: &str) -> Result<String, LlmError> {
    let client = transport::client()?;
    let target = Target::resolve(ctx, &client, &request.model).await?;

    let body = build_fim_request(&request.model, request);
    let builder = target
        .authorize(client.post(transport::join(&target.base, path)))
        .json(&body);
    let response = transport::send(ctx.provider, builder, &ctx.abort).await?;
    let completion: OpenAiCompletionResponse = transport::json(ctx.provider, response).await?;

    Ok(completion.into_text())
}

// -- Model listing --

pub(super) fn list_models<'a>(ctx: &'a ProviderContext<'a>) -> BoxFuture<'a, Result<Vec<ModelInfo>, LlmError>> {
    Box::pin(async move {
        let client = transport::client()?;
        let target = Target::resolve(ctx, &client, "").await?;

        let builder = target.authorize(client.get(transport::join(&target.base, "models")));
        let response = transport::send(ctx.provider, builder, &ctx.abort).await?;
        let list: OpenAiModelList = transport::json(ctx.provider, response).await?;

        let models: Vec<ModelInfo> = list
            .data
            .into_iter()
            .map(|model| ModelInfo {
                id: model.id,
                owned_by: model.owned_by,
            })
            .collect();
        tracing::debug!(provider = %ctx.provider, count = models.len(), "discovered models");

        Ok(models)
    })
}

#[cfg(test)]
mod tests {
    use relay_config::ProviderSettings;

    use super::*;
    use crate::abort::AbortHandle;
    use crate::error::ErrorKind;

    fn context(provider: ProviderName, settings: &ProviderSettings) -> ProviderContext<'_> {
        ProviderContext {
            provider,
            settings,
            allow_env_credentials: false,
            abort: AbortHandle::default(),
        }
    }

    async fn resolve(provider: ProviderName, settings: &ProviderSettings) -> Result<Target, LlmError> {
        Target::resolve(&context(provider, settings), &Client::new(), "gpt-4o").await
    }

    #[test]
    fn local_endpoints_gain_a_version_segment() {
        assert_eq!(versioned("http://localhost:8000"), "http://localhost:8000/v1");
        assert_eq!(versioned("http://localhost:8000/v1/"), "http://localhost:8000/v1");
    }

    #[tokio::test]
    async fn local_provider_needs_no_key() {
        let target = resolve(ProviderName::LmStudio, &ProviderSettings::default()).await.unwrap();
        assert_eq!(target.chat_url(), "http://localhost:1234/v1/chat/completions");
    }

    #[tokio::test]
    async fn compatible_endpoint_is_required_before_any_request() {
        let err = resolve(ProviderName::OpenAiCompatible, &ProviderSettings::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn compatible_provider_sends_custom_headers() {
        let settings = ProviderSettings {
            api_key: Some("k".into()),
            endpoint: Some("http://gateway.internal/v1".parse().unwrap()),
            headers_json: Some(r#"{"X-Team": "core"}"#.into()),
            ..ProviderSettings::default()
        };
        let target = resolve(ProviderName::OpenAiCompatible, &settings).await.unwrap();
        assert_eq!(target.headers["x-team"], "core");
        assert_eq!(target.chat_url(), "http://gateway.internal/v1/chat/completions");
    }

    #[tokio::test]
    async fn azure_routes_by_deployment_with_api_key_header() {
        let settings = ProviderSettings {
            api_key: Some("azure-key".into()),
            endpoint: Some("https://acme.openai.azure.com".parse().unwrap()),
            api_version: Some("2025-01-01-preview".into()),
            ..ProviderSettings::default()
        };
        let target = resolve(ProviderName::MicrosoftAzure, &settings).await.unwrap();
        assert_eq!(
            target.chat_url(),
            "https://acme.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2025-01-01-preview"
        );
        assert!(matches!(target.auth, Auth::ApiKeyHeader(_)));
    }

    #[tokio::test]
    async fn vertex_requires_project_and_region() {
        let err = resolve(ProviderName::GoogleVertex, &ProviderSettings::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("project"));
    }

    #[tokio::test]
    async fn openrouter_identifies_the_app() {
        let settings = ProviderSettings {
            api_key: Some("or-key".into()),
            ..ProviderSettings::default()
        };
        let target = resolve(ProviderName::OpenRouter, &settings).await.unwrap();
        assert_eq!(target.headers["http-referer"], OPENROUTER_REFERER);
        assert_eq!(target.chat_url(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn malformed_custom_headers_are_a_config_error() {
        let err = custom_headers("[1]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
