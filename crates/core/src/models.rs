use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ServiceDefinition;

/// Outcome of a classification pass: matched catalog keys in relevance order
/// (most relevant first) plus a human-readable reasoning string. Produced
/// fresh per turn and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub matched_service_keys: Vec<String>,
    pub reasoning: String,
}

impl ClassificationResult {
    pub fn empty() -> Self {
        Self {
            matched_service_keys: Vec::new(),
            reasoning: String::new(),
        }
    }
}

/// Per-session conversation state. `pending_matches` is non-empty exactly
/// while the session awaits a yes/no confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub pending_matches: Vec<ServiceDefinition>,
    pub original_input: String,
    pub expires_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            pending_matches: Vec::new(),
            original_input: String::new(),
            expires_at,
        }
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        !self.pending_matches.is_empty()
    }

    pub fn store_pending(&mut self, matches: Vec<ServiceDefinition>, original_input: &str) {
        self.pending_matches = matches;
        self.original_input = original_input.to_string();
    }

    pub fn clear_pending(&mut self) {
        self.pending_matches.clear();
        self.original_input.clear();
    }
}

/// How a reply is interpreted while a confirmation is pending. Anything
/// other than an exact yes/no falls through to fresh classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationAnswer {
    Yes,
    No,
    Other,
}

impl ConfirmationAnswer {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("yes") || trimmed.eq_ignore_ascii_case("y") {
            Self::Yes
        } else if trimmed.eq_ignore_ascii_case("no") || trimmed.eq_ignore_ascii_case("n") {
            Self::No
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Moderate,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
        }
    }
}

/// A ranked, scored recommendation derived from a confirmed match. Ephemeral;
/// computed on confirmation and returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub service_name: String,
    pub reason: String,
    pub contact: String,
    pub timeline: String,
    pub next_steps: String,
    pub priority_rank: usize,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub email_draft: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub session_id: Option<String>,
    pub text: String,
}

/// One turn's output. Exactly one of `message`/`clarifying_question` is set,
/// except on confirmation where `message` and `recommended_services` are both
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarifying_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_services: Option<Vec<Recommendation>>,
}

impl TurnReply {
    pub fn message(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: Some(message.into()),
            clarifying_question: None,
            recommended_services: None,
        }
    }

    pub fn clarifying_question(
        session_id: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: None,
            clarifying_question: Some(question.into()),
            recommended_services: None,
        }
    }

    pub fn recommendations(
        session_id: impl Into<String>,
        message: impl Into<String>,
        recommended_services: Vec<Recommendation>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: Some(message.into()),
            clarifying_question: None,
            recommended_services: Some(recommended_services),
        }
    }
}

/// Append-only record of one turn, handed to the interaction log sink. The
/// core never reads these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub assistant_reasoning: String,
    pub detected_services: Vec<String>,
    pub final_recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_answer_parsing_is_case_insensitive_and_trimmed() {
        assert_eq!(ConfirmationAnswer::parse("YES"), ConfirmationAnswer::Yes);
        assert_eq!(ConfirmationAnswer::parse(" y "), ConfirmationAnswer::Yes);
        assert_eq!(ConfirmationAnswer::parse("No"), ConfirmationAnswer::No);
        assert_eq!(ConfirmationAnswer::parse("n"), ConfirmationAnswer::No);
        assert_eq!(
            ConfirmationAnswer::parse("yes please"),
            ConfirmationAnswer::Other
        );
    }

    #[test]
    fn pending_matches_drive_awaiting_confirmation() {
        let mut state = ConversationState::new("s1", Utc::now());
        assert!(!state.is_awaiting_confirmation());

        state.store_pending(
            vec![ServiceDefinition {
                key: "financial_aid".to_string(),
                service_name: "Financial Aid Office".to_string(),
                keywords: vec!["tuition".to_string()],
                reason_template: "reason".to_string(),
                contact: "contact".to_string(),
                timeline: "soon".to_string(),
                next_steps: "steps".to_string(),
            }],
            "I can't pay tuition",
        );
        assert!(state.is_awaiting_confirmation());
        assert_eq!(state.original_input, "I can't pay tuition");

        state.clear_pending();
        assert!(!state.is_awaiting_confirmation());
        assert!(state.original_input.is_empty());
    }
}
