use std::sync::Arc;

use anyhow::{Context, Result};
use compass_core::{match_services, ClassificationResult, ServiceCatalog};
use serde::Deserialize;

use crate::{Reasoner, ReasoningService};

/// How a classification was produced. The fallback variant carries the reason
/// so callers can log a degraded path distinctly from a clean model match.
#[derive(Debug, Clone)]
pub enum Classification {
    Model(ClassificationResult),
    Fallback {
        result: ClassificationResult,
        reason: String,
    },
}

impl Classification {
    pub fn result(&self) -> &ClassificationResult {
        match self {
            Self::Model(result) => result,
            Self::Fallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> ClassificationResult {
        match self {
            Self::Model(result) => result,
            Self::Fallback { result, .. } => result,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Tolerant read of the reasoning reply: a JSON object with optional fields,
/// anything else is a parse failure.
#[derive(Debug, Deserialize)]
struct ModelReply {
    #[serde(default)]
    matched_services: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// Two-pass classifier: ask the reasoning service first, degrade silently to
/// the deterministic keyword matcher on any transport or parse failure.
#[derive(Clone)]
pub struct ModelClassifier {
    catalog: Arc<ServiceCatalog>,
    reasoner: Reasoner,
}

impl ModelClassifier {
    pub fn new(catalog: Arc<ServiceCatalog>, reasoner: Reasoner) -> Self {
        Self { catalog, reasoner }
    }

    pub async fn classify(&self, text: &str) -> Classification {
        match self.classify_with_model(text).await {
            Ok(result) => Classification::Model(result),
            Err(error) => Classification::Fallback {
                result: self.keyword_fallback(text),
                reason: format!("{error:#}"),
            },
        }
    }

    async fn classify_with_model(&self, text: &str) -> Result<ClassificationResult> {
        let prompt = self.build_prompt(text);
        let raw = self.reasoner.complete(&prompt).await?;

        let reply: ModelReply = serde_json::from_str(raw.trim())
            .context("reasoning reply did not parse as the expected JSON shape")?;

        // Keys outside the catalog are hallucinations; drop them without
        // failing the call. The model's ordering is kept as the ranking.
        let matched_service_keys = reply
            .matched_services
            .into_iter()
            .filter(|key| self.catalog.get(key).is_some())
            .collect();

        Ok(ClassificationResult {
            matched_service_keys,
            reasoning: reply.reasoning,
        })
    }

    fn keyword_fallback(&self, text: &str) -> ClassificationResult {
        ClassificationResult {
            matched_service_keys: match_services(&self.catalog, text)
                .into_iter()
                .map(|service| service.key)
                .collect(),
            reasoning: String::new(),
        }
    }

    fn build_prompt(&self, text: &str) -> String {
        let choices = self
            .catalog
            .keys()
            .map(|key| format!("- {key}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are Compass, an empathetic and professional university student support \
             navigation assistant.\n\
             \n\
             Your goal is to:\n\
             - Reduce cognitive load for students\n\
             - Interpret their situation carefully\n\
             - Recommend only relevant services\n\
             - Maintain a calm, supportive tone\n\
             \n\
             Analyse the student's message and determine which services apply.\n\
             \n\
             Choose ONLY from:\n\
             {choices}\n\
             \n\
             Return ONLY valid JSON in this exact format:\n\
             \n\
             {{\n\
             \x20 \"matched_services\": [\"service_key1\", \"service_key2\"],\n\
             \x20 \"reasoning\": \"Brief, compassionate explanation of why these services were selected.\"\n\
             }}\n\
             \n\
             Return JSON only.\n\
             \n\
             Student message:\n\
             \"{text}\""
        )
    }
}
