//! Rendering of turn history for prompts.

use ikms_core::Turn;

/// Rendered in place of an empty history.
pub const NO_HISTORY: &str = "No previous conversation history.";

/// Render turns as `User:`/`Assistant:` blocks separated by blank lines,
/// in ordinal order.
pub fn format_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return NO_HISTORY.to_string();
    }

    turns
        .iter()
        .map(|t| format!("User: {}\nAssistant: {}", t.question, t.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ikms_core::{Session, SessionId};

    #[test]
    fn empty_history_is_the_sentinel() {
        assert_eq!(format_history(&[]), NO_HISTORY);
    }

    #[test]
    fn turns_render_in_order() {
        let mut session = Session::new(SessionId::from("s"));
        session.push_turn("What is HNSW?", "A graph index.", "", false);
        session.push_turn("And IVF?", "A partitioned index.", "", true);

        let text = format_history(&session.turns);
        assert_eq!(
            text,
            "User: What is HNSW?\nAssistant: A graph index.\n\nUser: And IVF?\nAssistant: A partitioned index."
        );
    }

    #[test]
    fn every_question_and_answer_appears() {
        let mut session = Session::new(SessionId::from("s"));
        for i in 0..5 {
            session.push_turn(format!("q{i}"), format!("a{i}"), "", false);
        }
        let text = format_history(&session.turns);
        let mut last = 0;
        for i in 0..5 {
            let q = text.find(&format!("User: q{i}")).unwrap();
            let a = text.find(&format!("Assistant: a{i}")).unwrap();
            assert!(q >= last && a > q);
            last = a;
        }
    }
}
