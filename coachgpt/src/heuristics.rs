//! Local scoring used when the model's reply can't be parsed.

use std::sync::OnceLock;

use regex::Regex;
use shared::HistoryEntry;

use crate::catalog::{Role, FOLLOW_UPS};

const BASE_SCORE: u32 = 50;
const MAX_SCORE: u32 = 100;

const TRANSITION_WORDS: [&str; 6] = [
    "however",
    "therefore",
    "additionally",
    "furthermore",
    "regarding",
    "concerning",
];

const STRUCTURE_MARKERS: [&str; 3] = ["First", "Second", "Additionally"];

const SENTENCE_ENDS: [char; 3] = ['.', '!', '?'];

/// Length in UTF-16 code units, the unit client-side text fields count in.
fn text_len(message: &str) -> usize {
    message.encode_utf16().count()
}

pub fn calculate_score(message: &str) -> u32 {
    let mut score = BASE_SCORE;
    let len = text_len(message);

    if len > 100 {
        score += 10;
    }
    if len > 200 {
        score += 10;
    }

    let lowered = message.to_lowercase();
    for word in TRANSITION_WORDS {
        if lowered.contains(word) {
            score += 5;
        }
    }

    if message.contains(SENTENCE_ENDS) {
        score += 5;
    }
    if message.split(SENTENCE_ENDS).count() > 2 {
        score += 5;
    }

    if STRUCTURE_MARKERS.iter().any(|marker| message.contains(marker)) {
        score += 10;
    }

    score.min(MAX_SCORE)
}

fn professional_tone() -> &'static Regex {
    static TONE: OnceLock<Regex> = OnceLock::new();
    TONE.get_or_init(|| {
        Regex::new(r"(?i)(?-u:\b)(?:however|therefore|regarding)(?-u:\b)")
            .expect("tone pattern is valid")
    })
}

pub fn generate_feedback(message: &str, score: u32) -> String {
    let mut parts = Vec::with_capacity(3);

    parts.push(if score >= 80 {
        "Excellent response! Your communication is clear and professional."
    } else if score >= 60 {
        "Good response! Consider adding more detail to strengthen your message."
    } else {
        "Your response could be improved. Try to be more detailed and structured."
    });

    if text_len(message) < 100 {
        parts.push("Consider providing more context and detail in your responses.");
    }

    if !professional_tone().is_match(message) {
        parts.push("Try using more professional language and transitional phrases.");
    }

    parts.join(" ")
}

/// Picks the next question by how far the conversation has got. The role and
/// the answer itself don't influence the choice.
pub fn generate_follow_up(_role: &Role, _user_message: &str, history: &[HistoryEntry]) -> &'static str {
    let index = (history.len() / 2).min(FOLLOW_UPS.len() - 1);
    FOLLOW_UPS[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::lookup;

    fn history(len: usize) -> Vec<HistoryEntry> {
        (0..len)
            .map(|i| HistoryEntry {
                role: if i % 2 == 0 { "ai" } else { "user" }.to_owned(),
                content: format!("turn {i}"),
            })
            .collect()
    }

    #[test]
    fn empty_message_scores_base() {
        assert_eq!(calculate_score(""), 50);
    }

    #[test]
    fn single_sentence_gets_punctuation_bonus_only() {
        assert_eq!(calculate_score("Sure thing."), 55);
    }

    #[test]
    fn two_sentences_get_segment_bonus() {
        assert_eq!(calculate_score("Sure. I can."), 60);
    }

    #[test]
    fn each_transition_word_counts_once() {
        assert_eq!(calculate_score("however however however"), 55);
        assert_eq!(calculate_score("HOWEVER and Therefore"), 60);
    }

    #[test]
    fn structure_markers_are_case_sensitive() {
        assert_eq!(calculate_score("first we test"), 50);
        assert_eq!(calculate_score("First we test"), 60);
    }

    #[test]
    fn additionally_counts_as_word_and_structure() {
        assert_eq!(calculate_score("Additionally we test"), 65);
    }

    #[test]
    fn length_bonuses_stack() {
        assert_eq!(calculate_score(&"a".repeat(101)), 60);
        assert_eq!(calculate_score(&"a".repeat(201)), 70);
        assert_eq!(calculate_score(&"a".repeat(100)), 50);
    }

    #[test]
    fn length_counts_utf16_units() {
        let grins = "\u{1F600}".repeat(60);
        assert_eq!(text_len(&grins), 120);
        assert_eq!(calculate_score(&grins), 60);
        assert_eq!(calculate_score(&"\u{1F600}".repeat(101)), 70);
    }

    #[test]
    fn wide_characters_are_not_short_answers() {
        let grins = format!("However {}", "\u{1F600}".repeat(50));
        assert_eq!(
            generate_feedback(&grins, 90),
            "Excellent response! Your communication is clear and professional."
        );
        assert!(generate_feedback(&"\u{1F600}".repeat(49), 90)
            .contains("Consider providing more context"));
    }

    #[test]
    fn rich_answer_is_clamped_to_max() {
        let mut message = String::from(
            "First, I would acknowledge the delay. However, the root cause was scope growth. \
             Therefore, I would propose a revised plan",
        );
        while message.chars().count() < 249 {
            message.push(' ');
        }
        message.push('.');
        assert_eq!(message.chars().count(), 250);

        assert_eq!(calculate_score(&message), 100);
    }

    #[test]
    fn score_never_exceeds_max() {
        let message = format!(
            "First. Second! Additionally? however therefore furthermore regarding concerning {}",
            "x".repeat(300)
        );
        assert_eq!(calculate_score(&message), 100);
    }

    #[test]
    fn feedback_for_short_plain_answer() {
        assert_eq!(
            generate_feedback("ok", 50),
            "Your response could be improved. Try to be more detailed and structured. \
             Consider providing more context and detail in your responses. \
             Try using more professional language and transitional phrases."
        );
    }

    #[test]
    fn feedback_tiers_follow_score() {
        let long_professional = format!("However, {}", "x".repeat(120));

        assert_eq!(
            generate_feedback(&long_professional, 80),
            "Excellent response! Your communication is clear and professional."
        );
        assert_eq!(
            generate_feedback(&long_professional, 60),
            "Good response! Consider adding more detail to strengthen your message."
        );
    }

    #[test]
    fn tone_check_needs_whole_word() {
        let padding = "x".repeat(120);
        let embedded = format!("neverthelesshowever {padding}");
        let standalone = format!("REGARDING the plan {padding}");

        assert!(generate_feedback(&embedded, 90).ends_with("transitional phrases."));
        assert!(!generate_feedback(&standalone, 90).ends_with("transitional phrases."));
    }

    #[test]
    fn follow_up_walks_the_list_by_history_length() {
        let role = lookup("developer").unwrap();

        assert_eq!(generate_follow_up(role, "hi", &history(0)), FOLLOW_UPS[0]);
        assert_eq!(generate_follow_up(role, "hi", &history(1)), FOLLOW_UPS[0]);
        assert_eq!(generate_follow_up(role, "hi", &history(5)), FOLLOW_UPS[2]);
        assert_eq!(generate_follow_up(role, "hi", &history(16)), FOLLOW_UPS[8]);
        assert_eq!(generate_follow_up(role, "hi", &history(40)), FOLLOW_UPS[8]);
    }

    #[test]
    fn follow_up_ignores_role_and_answer() {
        let a = lookup("developer").unwrap();
        let b = lookup("hr-specialist").unwrap();

        assert_eq!(
            generate_follow_up(a, "short", &history(6)),
            generate_follow_up(b, "a much longer answer", &history(6))
        );
    }
}
