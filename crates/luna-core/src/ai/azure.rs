use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{CompletionBackend, CompletionRequest};
use crate::config::ClientSettings;
use crate::error::{ClientError, RequestError};

#[derive(Deserialize)]
struct AzureChoice {
    message: AzureResponseMessage,
}

#[derive(Deserialize)]
struct AzureResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct AzureResponse {
    #[serde(default)]
    choices: Vec<AzureChoice>,
}

#[derive(Deserialize)]
struct AzureErrorBody {
    error: AzureErrorDetail,
}

#[derive(Deserialize)]
struct AzureErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Client for an Azure OpenAI chat deployment with "on your data" retrieval
#[derive(Clone)]
pub struct AzureOpenAIClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    api_version: String,
}

impl AzureOpenAIClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let endpoint = Url::parse(settings.endpoint.trim()).map_err(|e| {
            ClientError::InvalidEndpoint {
                endpoint: settings.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ClientError::InvalidEndpoint {
                endpoint: settings.endpoint.clone(),
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }

        Ok(Self {
            client: Client::builder().build()?,
            endpoint,
            api_key: settings.api_key.clone(),
            api_version: settings.api_version.clone(),
        })
    }

    /// `{endpoint}/openai/deployments/{deployment}/chat/completions`, with the
    /// deployment name encoded as a single path segment
    fn completions_url(&self, deployment: &str) -> Result<Url, RequestError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| RequestError::network(format!("endpoint {} cannot carry a path", self.endpoint)))?
            .pop_if_empty()
            .extend(["openai", "deployments"])
            .push(deployment)
            .extend(["chat", "completions"]);
        Ok(url)
    }
}

#[async_trait]
impl CompletionBackend for AzureOpenAIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, RequestError> {
        let url = self.completions_url(&request.model)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(url.clone())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| RequestError::network(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RequestError::network(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let azure_response: AzureResponse = serde_json::from_str(&text)
            .map_err(|e| RequestError::malformed(format!("could not decode response: {}", e)))?;

        azure_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RequestError::malformed("response contained no reply"))
    }
}

fn status_error(status: StatusCode, body: &str) -> RequestError {
    let detail = match serde_json::from_str::<AzureErrorBody>(body) {
        Ok(AzureErrorBody { error }) => match error.code {
            Some(code) => format!("{}: {}", code, error.message),
            None => error.message,
        },
        Err(_) => body.trim().to_string(),
    };
    let message = format!("Azure OpenAI error {}: {}", status, detail);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RequestError::auth(message),
        _ => RequestError::remote(message),
    }
}
