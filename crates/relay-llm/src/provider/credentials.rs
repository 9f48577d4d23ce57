//! Credential resolution, done before any request is sent

use std::path::PathBuf;

use relay_config::{ProviderName, ProviderSettings};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::LlmError;

/// Placeholder key sent to local servers, which ignore it
const LOCAL_PLACEHOLDER_KEY: &str = "noop";

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// API key for a provider
///
/// Order: configured key, then the provider's environment variable when
/// `allow_env` is set, then a placeholder for local servers.
///
/// # Errors
///
/// Returns [`LlmError::Config`] when no key is available.
pub(crate) fn api_key(
    provider: ProviderName,
    settings: &ProviderSettings,
    allow_env: bool,
) -> Result<SecretString, LlmError> {
    if let Some(key) = settings.api_key.as_ref().filter(|k| !k.expose_secret().trim().is_empty()) {
        return Ok(key.clone());
    }

    if allow_env
        && let Some(var) = provider.api_key_env()
        && let Ok(value) = std::env::var(var)
        && !value.trim().is_empty()
    {
        return Ok(SecretString::from(value));
    }

    if provider.is_local() {
        return Ok(SecretString::from(LOCAL_PLACEHOLDER_KEY));
    }

    Err(LlmError::config(format!(
        "{} API key is not set. Add it in the provider settings.",
        provider.title()
    )))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApplicationDefaultCredentials {
    AuthorizedUser {
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn adc_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
        && !path.is_empty()
    {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/gcloud/application_default_credentials.json"))
}

/// OAuth access token for Google Vertex AI
///
/// Uses gcloud application-default user credentials when present, otherwise the
/// GCE metadata server.
///
/// # Errors
///
/// Returns [`LlmError::Config`] when no token can be obtained.
pub(crate) async fn vertex_access_token(client: &Client) -> Result<SecretString, LlmError> {
    let fail = |detail: String| {
        LlmError::config(format!(
            "Could not get Google Vertex AI credentials ({detail}). Run `gcloud auth application-default login`."
        ))
    };

    let adc = match adc_path() {
        Some(path) => match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Some(
                serde_json::from_str::<ApplicationDefaultCredentials>(&contents)
                    .map_err(|e| fail(format!("unreadable {}: {e}", path.display())))?,
            ),
            Err(_) => None,
        },
        None => None,
    };

    let response = match adc {
        Some(ApplicationDefaultCredentials::AuthorizedUser {
            client_id,
            client_secret,
            refresh_token,
        }) => client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.expose_secret()),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| fail(format!("token refresh failed: {e}")))?,
        Some(ApplicationDefaultCredentials::Other) => {
            return Err(fail("only authorized_user credentials are supported".to_owned()));
        }
        None => client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| fail(format!("metadata server unreachable: {e}")))?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "google token endpoint returned error");
        return Err(fail(format!("token endpoint returned {}: {body}", status.as_u16())));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| fail(format!("failed to decode token response: {e}")))?;
    if token.access_token.trim().is_empty() {
        return Err(fail("token response did not include an access token".to_owned()));
    }

    Ok(SecretString::from(token.access_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn settings(key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            api_key: key.map(SecretString::from),
            ..ProviderSettings::default()
        }
    }

    #[test]
    fn configured_key_wins() {
        temp_env::with_var("OPENAI_API_KEY", Some("from-env"), || {
            let key = api_key(ProviderName::OpenAi, &settings(Some("sk-set")), true).unwrap();
            assert_eq!(key.expose_secret(), "sk-set");
        });
    }

    #[test]
    fn env_fallback_only_when_allowed() {
        temp_env::with_var("ANTHROPIC_API_KEY", Some("from-env"), || {
            let key = api_key(ProviderName::Anthropic, &settings(None), true).unwrap();
            assert_eq!(key.expose_secret(), "from-env");

            let err = api_key(ProviderName::Anthropic, &settings(None), false).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config);
            assert!(err.to_string().contains("Anthropic"));
        });
    }

    #[test]
    fn blank_key_counts_as_missing() {
        temp_env::with_var_unset("GROQ_API_KEY", || {
            let err = api_key(ProviderName::Groq, &settings(Some("  ")), true).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config);
        });
    }

    #[test]
    fn local_providers_get_a_placeholder() {
        let key = api_key(ProviderName::Ollama, &settings(None), false).unwrap();
        assert_eq!(key.expose_secret(), LOCAL_PLACEHOLDER_KEY);
    }

    #[test]
    fn adc_path_prefers_explicit_variable() {
        temp_env::with_vars(
            [
                ("GOOGLE_APPLICATION_CREDENTIALS", Some("/tmp/adc.json")),
                ("HOME", Some("/home/dev")),
            ],
            || assert_eq!(adc_path(), Some(PathBuf::from("/tmp/adc.json"))),
        );
        temp_env::with_vars(
            [("GOOGLE_APPLICATION_CREDENTIALS", None), ("HOME", Some("/home/dev"))],
            || {
                assert_eq!(
                    adc_path(),
                    Some(PathBuf::from("/home/dev/.config/gcloud/application_default_credentials.json"))
                );
            },
        );
    }
}
