use crate::catalog::ServiceDefinition;
use crate::models::{ConfidenceLevel, Recommendation};

/// Preamble shown above a confirmed recommendation list.
pub const RECOMMENDATION_PREAMBLE: &str = "Thank you for sharing that. Based on what \
you've described, here are the support services that may be able to assist you:";

/// Sent when the student declines the matched services.
pub const DECLINED_FOLLOW_UP: &str = "Of course. Could you share a bit more about what \
you're currently struggling with — such as financial concerns, academic pressure, or \
health-related issues?";

/// Sent when no service could be matched at all.
pub const NO_MATCH_MESSAGE: &str = "I'm sorry, I couldn't confidently match your concern \
to a specific service yet. Could you provide a little more detail?";

/// Turns confirmed matches into ranked recommendations. Rank is 1-based input
/// order; confidence decays linearly from 0.95 in steps of 0.10, rounded to
/// two decimals, with no lower floor. The level threshold knows only High and
/// Moderate, so non-positive scores still read Moderate.
pub fn build_recommendations(
    matched: &[ServiceDefinition],
    original_input: &str,
) -> Vec<Recommendation> {
    matched
        .iter()
        .enumerate()
        .map(|(index, service)| {
            let confidence_score = ((0.95 - index as f64 * 0.10) * 100.0).round() / 100.0;
            let confidence_level = if confidence_score > 0.8 {
                ConfidenceLevel::High
            } else {
                ConfidenceLevel::Moderate
            };

            Recommendation {
                service_name: service.service_name.clone(),
                reason: service.reason_template.clone(),
                contact: service.contact.clone(),
                timeline: service.timeline.clone(),
                next_steps: service.next_steps.clone(),
                priority_rank: index + 1,
                confidence_score,
                confidence_level,
                email_draft: draft_outreach_email(service, original_input),
            }
        })
        .collect()
}

/// Fills the fixed outreach template with the service display name and the
/// text that produced the match, signed with a placeholder name.
pub fn draft_outreach_email(service: &ServiceDefinition, original_input: &str) -> String {
    format!(
        "Subject: Request for Support\n\
         \n\
         Dear {},\n\
         \n\
         I hope you are well.\n\
         \n\
         I am writing to seek advice regarding support, as I have {}.\n\
         I would be grateful if you could please advise me on the available options and the \
         documentation required to proceed with an application for assistance.\n\
         Thank you very much for your time and support.\n\
         \n\
         Kind regards,\n\
         [Your Name]\n",
        service.service_name, original_input
    )
}

/// The clarifying question asked before recommendations are finalized,
/// embedding the classifier's reasoning and the matched service names.
pub fn compose_clarifying_question(reasoning: &str, matched: &[ServiceDefinition]) -> String {
    let names = matched
        .iter()
        .map(|service| service.service_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let question = format!(
        "I identified the following relevant services: {names}. Would you like more details?"
    );

    if reasoning.trim().is_empty() {
        question
    } else {
        format!("{} {question}", reasoning.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceCatalog;

    fn service(index: usize) -> ServiceDefinition {
        ServiceDefinition {
            key: format!("service_{index}"),
            service_name: format!("Service {index}"),
            keywords: vec!["keyword".to_string()],
            reason_template: format!("reason {index}"),
            contact: "contact".to_string(),
            timeline: "timeline".to_string(),
            next_steps: "steps".to_string(),
        }
    }

    #[test]
    fn ranks_and_scores_follow_input_order() {
        let matched = vec![service(0), service(1)];
        let recommendations = build_recommendations(&matched, "trouble paying rent");

        assert_eq!(recommendations[0].priority_rank, 1);
        assert_eq!(recommendations[0].confidence_score, 0.95);
        assert_eq!(recommendations[0].confidence_level, ConfidenceLevel::High);

        assert_eq!(recommendations[1].priority_rank, 2);
        assert_eq!(recommendations[1].confidence_score, 0.85);
        assert_eq!(recommendations[1].confidence_level, ConfidenceLevel::High);
    }

    #[test]
    fn second_tier_scores_read_moderate() {
        let matched: Vec<_> = (0..3).map(service).collect();
        let recommendations = build_recommendations(&matched, "input");

        assert_eq!(recommendations[2].confidence_score, 0.75);
        assert_eq!(recommendations[2].confidence_level, ConfidenceLevel::Moderate);
    }

    #[test]
    fn decay_is_unclamped_and_never_reads_low() {
        let matched: Vec<_> = (0..12).map(service).collect();
        let recommendations = build_recommendations(&matched, "input");

        let last = recommendations.last().unwrap();
        assert_eq!(last.priority_rank, 12);
        assert!(last.confidence_score <= 0.0);
        assert_eq!(last.confidence_level, ConfidenceLevel::Moderate);
    }

    #[test]
    fn email_draft_embeds_service_name_and_input() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let financial = catalog.get("financial_aid").unwrap();
        let draft = draft_outreach_email(financial, "fallen behind on tuition payments");

        assert!(draft.starts_with("Subject: Request for Support"));
        assert!(draft.contains("Dear Financial Aid Office,"));
        assert!(draft.contains("as I have fallen behind on tuition payments."));
        assert!(draft.trim_end().ends_with("[Your Name]"));
    }

    #[test]
    fn clarifying_question_embeds_reasoning_and_names() {
        let matched = vec![service(0), service(1)];
        let question = compose_clarifying_question("You sound stretched thin.", &matched);

        assert_eq!(
            question,
            "You sound stretched thin. I identified the following relevant services: \
             Service 0, Service 1. Would you like more details?"
        );
    }

    #[test]
    fn clarifying_question_without_reasoning_has_no_leading_gap() {
        let matched = vec![service(0)];
        let question = compose_clarifying_question("", &matched);
        assert!(question.starts_with("I identified"));
    }
}
