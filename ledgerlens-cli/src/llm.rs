use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use ledgerlens_core::{ChatCompletion, CollaboratorError, CompletionRequest};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::{LlmSection, Provider};

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com";

/// Chat-completions client for Azure OpenAI deployments and OpenAI-compatible APIs.
#[derive(Debug, Clone)]
pub struct HttpChat {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    /// Sent in the body for OpenAI; Azure routes by deployment in the URL.
    model: Option<String>,
}

impl HttpChat {
    pub fn from_config(llm: &LlmSection, api_key: &str) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = llm.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("build HTTP client")?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let (url, model) = match llm.provider {
            Provider::Azure => {
                if llm.base_url.trim().is_empty() {
                    bail!("llm.base_url is empty; set it or AZURE_OPENAI_ENDPOINT");
                }
                if llm.model.trim().is_empty() {
                    bail!("llm.model (deployment) is empty; set it or AZURE_OPENAI_DEPLOYMENT");
                }
                let key = HeaderValue::from_str(api_key).context("invalid API key")?;
                headers.insert("api-key", key);
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    llm.base_url.trim_end_matches('/'),
                    llm.model.trim(),
                    llm.api_version
                );
                (url, None)
            }
            Provider::OpenAI => {
                if llm.model.trim().is_empty() {
                    bail!("llm.model is empty");
                }
                let base = if llm.base_url.trim().is_empty() {
                    OPENAI_DEFAULT_BASE
                } else {
                    llm.base_url.trim_end_matches('/')
                };
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {api_key}")).context("invalid API key")?,
                );
                (format!("{base}/v1/chat/completions"), Some(llm.model.trim().to_string()))
            }
        };

        Ok(Self {
            client,
            url,
            headers,
            model,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [Msg<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
}

/// Map a non-success HTTP status to the collaborator error taxonomy.
fn status_error(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: String,
) -> CollaboratorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CollaboratorError::Auth {
            message: format!("{status} {body}"),
        },
        StatusCode::TOO_MANY_REQUESTS => CollaboratorError::RateLimited {
            retry_after_secs,
            message: body,
        },
        _ => CollaboratorError::Api {
            status: status.as_u16(),
            message: body,
            retryable: status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT,
        },
    }
}

#[async_trait]
impl ChatCompletion for HttpChat {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        let body = Req {
            model: self.model.as_deref(),
            messages: [
                Msg {
                    role: "system",
                    content: &request.system,
                },
                Msg {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport {
                message: e.to_string(),
            })?;

        let status = resp.status();
        debug!(%status, "chat completion response");
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let txt = resp.text().await.unwrap_or_default();
            warn!(%status, "chat completion failed");
            return Err(status_error(status, retry_after, txt));
        }

        let out: Resp = resp.json().await.map_err(|e| CollaboratorError::MalformedResponse {
            message: e.to_string(),
        })?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(content)
    }
}
