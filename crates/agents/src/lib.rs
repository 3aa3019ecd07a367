use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{Duration, Utc};
use compass_core::{
    build_recommendations, compose_clarifying_question, is_crisis, ConfirmationAnswer,
    ConversationState, InteractionLogEntry, Recommendation, ServiceCatalog, ServiceDefinition,
    TurnInput, TurnReply, CRISIS_MESSAGE, DECLINED_FOLLOW_UP, NO_MATCH_MESSAGE,
    RECOMMENDATION_PREAMBLE,
};
use compass_observability::AppMetrics;
use compass_reasoning::{Classification, ModelClassifier, Reasoner};
use compass_storage::{InteractionLogSink, SessionStateRepository};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const SESSION_TTL_HOURS: i64 = 24;

/// Per-turn orchestrator: crisis filter, confirmation flow, classification,
/// state update, recommendation build, interaction logging. One instance
/// serves all sessions; state is keyed per session in the store.
#[derive(Clone)]
pub struct NavigatorAgent<S>
where
    S: SessionStateRepository + InteractionLogSink,
{
    catalog: Arc<ServiceCatalog>,
    classifier: ModelClassifier,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S> NavigatorAgent<S>
where
    S: SessionStateRepository + InteractionLogSink,
{
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        reasoner: Reasoner,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            classifier: ModelClassifier::new(catalog.clone(), reasoner),
            catalog,
            store,
            metrics,
        }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    #[instrument(skip(self, input))]
    pub async fn handle_turn(&self, input: TurnInput) -> Result<TurnReply> {
        let started = Instant::now();
        self.metrics.inc_turn();

        let session_id = input
            .session_id
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let text = input.text.trim().to_string();

        // Safety check runs before everything else, including a pending
        // confirmation, and never touches conversation state.
        if is_crisis(&text) {
            self.metrics.inc_crisis();
            self.log_interaction(&text, "crisis keywords detected", &[], &[])
                .await;
            self.metrics.observe_latency(started.elapsed());
            info!(session_id = %session_id, "crisis filter triggered, conversation short-circuited");
            return Ok(TurnReply::message(session_id, CRISIS_MESSAGE));
        }

        let mut state = self
            .store
            .load_state(&session_id)
            .await?
            .unwrap_or_else(|| {
                ConversationState::new(&session_id, Utc::now() + Duration::hours(SESSION_TTL_HOURS))
            });

        if state.is_awaiting_confirmation() {
            match ConfirmationAnswer::parse(&text) {
                ConfirmationAnswer::Yes => {
                    return self.confirm_pending(session_id, state, &text, started).await;
                }
                ConfirmationAnswer::No => {
                    return self.decline_pending(session_id, state, &text, started).await;
                }
                // Anything else falls through to fresh classification. A new
                // match replaces the pending set below; a zero-match reply
                // leaves it in place, as the original flow did.
                ConfirmationAnswer::Other => {}
            }
        }

        self.metrics.inc_model_inference();
        let classification = self.classifier.classify(&text).await;
        if let Classification::Fallback { reason, .. } = &classification {
            self.metrics.inc_keyword_fallback();
            warn!(
                session_id = %session_id,
                reason = %reason,
                "model classification degraded to keyword matcher"
            );
        }

        let result = classification.into_result();
        let matched: Vec<ServiceDefinition> = result
            .matched_service_keys
            .iter()
            .filter_map(|key| self.catalog.get(key).cloned())
            .collect();

        let reply = if matched.is_empty() {
            TurnReply::message(&session_id, NO_MATCH_MESSAGE)
        } else {
            let question = compose_clarifying_question(&result.reasoning, &matched);
            state.store_pending(matched, &text);
            TurnReply::clarifying_question(&session_id, question)
        };

        state.expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
        self.store.upsert_state(&state).await?;

        self.log_interaction(&text, &result.reasoning, &result.matched_service_keys, &[])
            .await;
        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            matched = result.matched_service_keys.len(),
            awaiting_confirmation = state.is_awaiting_confirmation(),
            "turn handled"
        );

        Ok(reply)
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.store.purge_expired(Utc::now()).await
    }

    async fn confirm_pending(
        &self,
        session_id: String,
        mut state: ConversationState,
        user_input: &str,
        started: Instant,
    ) -> Result<TurnReply> {
        let recommendations = build_recommendations(&state.pending_matches, &state.original_input);
        let detected: Vec<String> = state
            .pending_matches
            .iter()
            .map(|service| service.key.clone())
            .collect();

        state.clear_pending();
        state.expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
        self.store.upsert_state(&state).await?;

        self.metrics.add_recommendations(recommendations.len());
        self.log_interaction(user_input, "", &detected, &recommendations)
            .await;
        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            recommendations = recommendations.len(),
            "confirmation accepted, recommendations issued"
        );

        Ok(TurnReply::recommendations(
            session_id,
            RECOMMENDATION_PREAMBLE,
            recommendations,
        ))
    }

    async fn decline_pending(
        &self,
        session_id: String,
        mut state: ConversationState,
        user_input: &str,
        started: Instant,
    ) -> Result<TurnReply> {
        state.clear_pending();
        state.expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
        self.store.upsert_state(&state).await?;

        self.log_interaction(user_input, "", &[], &[]).await;
        self.metrics.observe_latency(started.elapsed());
        info!(session_id = %session_id, "confirmation declined, asking for more detail");

        Ok(TurnReply::message(session_id, DECLINED_FOLLOW_UP))
    }

    /// Interaction logging is best-effort: a failing sink is reported and
    /// otherwise ignored so it can never break a student-facing turn.
    async fn log_interaction(
        &self,
        user_input: &str,
        assistant_reasoning: &str,
        detected_services: &[String],
        final_recommendations: &[Recommendation],
    ) {
        let entry = InteractionLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_input: user_input.to_string(),
            assistant_reasoning: assistant_reasoning.to_string(),
            detected_services: detected_services.to_vec(),
            final_recommendations: final_recommendations.to_vec(),
        };

        if let Err(error) = self.store.append(&entry).await {
            warn!(error = %format!("{error:#}"), "failed appending interaction log entry");
        }
    }
}
