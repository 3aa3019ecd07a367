mod classifier;
mod http;
mod scripted;

use anyhow::{bail, Result};

pub use classifier::{Classification, ModelClassifier};
pub use http::HttpReasoningService;
pub use scripted::ScriptedReasoningService;

/// External reasoning collaborator: takes an instructional prompt, returns
/// free-form text. One blocking call per turn, no retries; callers treat any
/// error as a classifier failure.
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Concrete reasoning backends behind one dispatching type, so the classifier
/// stays free of trait objects.
#[derive(Clone)]
pub enum Reasoner {
    Http(HttpReasoningService),
    Scripted(ScriptedReasoningService),
    Disabled,
}

impl Reasoner {
    /// Reads `COMPASS_REASONING_URL` and friends. An unset URL disables the
    /// model path entirely; every classification then takes the keyword
    /// fallback, which is the intended offline behavior.
    pub fn from_env() -> Result<Self> {
        match std::env::var("COMPASS_REASONING_URL") {
            Ok(url) if !url.trim().is_empty() => {
                Ok(Self::Http(HttpReasoningService::from_env(url.trim())?))
            }
            _ => Ok(Self::Disabled),
        }
    }
}

impl ReasoningService for Reasoner {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            Self::Http(service) => service.complete(prompt).await,
            Self::Scripted(service) => service.complete(prompt).await,
            Self::Disabled => bail!("reasoning service is not configured"),
        }
    }
}
