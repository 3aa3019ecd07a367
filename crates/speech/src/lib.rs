use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::warn;

const DEFAULT_VOICE: &str = "olivia";
const DEFAULT_TIMEOUT_SECONDS: u64 = 20;

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    output_format: &'a str,
}

/// Speech-synthesis collaborator. Failures never surface to the caller as
/// errors; `synthesize_or_none` maps them to "no audio available".
#[derive(Clone)]
pub enum SpeechSynthesizer {
    Http(HttpSpeechService),
    Disabled,
}

impl SpeechSynthesizer {
    /// Reads `COMPASS_SPEECH_URL`; unset disables audio output.
    pub fn from_env() -> Result<Self> {
        match std::env::var("COMPASS_SPEECH_URL") {
            Ok(url) if !url.trim().is_empty() => {
                Ok(Self::Http(HttpSpeechService::from_env(url.trim())?))
            }
            _ => Ok(Self::Disabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Http(service) => service.synthesize(text).await,
            Self::Disabled => bail!("speech synthesis is not configured"),
        }
    }

    /// The degraded contract the conversation flow relies on: audio bytes or
    /// nothing, never an error.
    pub async fn synthesize_or_none(&self, text: &str) -> Option<Vec<u8>> {
        match self.synthesize(text).await {
            Ok(audio) => Some(audio),
            Err(error) => {
                if self.is_enabled() {
                    warn!(error = %format!("{error:#}"), "speech synthesis failed, degrading to no audio");
                }
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSpeechService {
    client: reqwest::Client,
    endpoint: String,
    voice: String,
}

impl HttpSpeechService {
    pub fn new(endpoint: impl Into<String>, voice: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(timeout)
            .build()
            .context("failed to build speech HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            voice: voice.into(),
        })
    }

    pub fn from_env(endpoint: &str) -> Result<Self> {
        let voice = std::env::var("COMPASS_SPEECH_VOICE")
            .unwrap_or_else(|_| DEFAULT_VOICE.to_string());
        let timeout = std::env::var("COMPASS_SPEECH_TIMEOUT_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        Self::new(endpoint, voice, Duration::from_secs(timeout))
    }

    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = SynthesisRequest {
            text,
            voice: &self.voice,
            output_format: "mp3",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("speech service request failed")?;

        if !response.status().is_success() {
            bail!("speech service returned status {}", response.status());
        }

        let audio = response
            .bytes()
            .await
            .context("failed reading speech service audio payload")?;

        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_backend_degrades_to_none() {
        let synthesizer = SpeechSynthesizer::Disabled;
        assert!(!synthesizer.is_enabled());
        assert!(synthesizer.synthesize_or_none("hello").await.is_none());
    }
}
