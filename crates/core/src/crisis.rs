/// Phrases that trigger the safety short-circuit. Matched as substrings of
/// the lower-cased input, before any other processing.
const CRISIS_PHRASES: &[&str] = &[
    "suicidal",
    "self harm",
    "harm myself",
    "kill myself",
    "end my life",
];

/// The fixed safety reply. Returned verbatim whenever the filter triggers,
/// regardless of conversation state.
pub const CRISIS_MESSAGE: &str = "I'm really sorry that you're feeling this way. \
Your safety is important. Please consider reaching out to emergency services \
or contacting your university's crisis support service immediately. \
If you're in Australia, Lifeline is available on 13 11 14.";

pub fn is_crisis(text: &str) -> bool {
    let lower = text.to_lowercase();
    CRISIS_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_on_crisis_phrase_as_substring() {
        assert!(is_crisis("lately I've been feeling suicidal and lost"));
        assert!(is_crisis("I want to END MY LIFE"));
    }

    #[test]
    fn is_case_insensitive() {
        assert!(is_crisis("I might Harm Myself"));
    }

    #[test]
    fn does_not_trigger_on_ordinary_text() {
        assert!(!is_crisis("I'm struggling to pay my tuition fees"));
    }
}
