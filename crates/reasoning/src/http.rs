use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ReasoningService;

const DEFAULT_MODEL: &str = "compass-triage-v1";
const DEFAULT_TIMEOUT_SECONDS: u64 = 20;
const MAX_TOKENS: u32 = 300;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    completion: String,
}

/// HTTP reasoning backend. The request timeout is deliberate: an expired
/// call surfaces as an error and the caller degrades to the keyword path.
#[derive(Debug, Clone)]
pub struct HttpReasoningService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpReasoningService {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build reasoning HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_env(endpoint: &str) -> Result<Self> {
        let api_key = std::env::var("COMPASS_REASONING_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let model = std::env::var("COMPASS_REASONING_MODEL")
            .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout = std::env::var("COMPASS_REASONING_TIMEOUT_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        Self::new(endpoint, api_key, model, Duration::from_secs(timeout))
    }
}

impl ReasoningService for HttpReasoningService {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            prompt,
            temperature: 0.0,
            max_tokens: MAX_TOKENS,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .context("reasoning service request failed")?;

        if !response.status().is_success() {
            bail!("reasoning service returned status {}", response.status());
        }

        let payload: CompletionResponse = response
            .json()
            .await
            .context("reasoning service response was not a completion envelope")?;

        Ok(payload.completion)
    }
}
