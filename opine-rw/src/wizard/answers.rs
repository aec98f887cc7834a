//! In-memory answer store
//!
//! Owns the respondent's in-flight answers for the lifetime of one wizard
//! session. Nothing here is persisted; the submission pipeline drains the
//! store once, on success.

use std::collections::HashMap;

use opine_common::db::AnswerValue;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    answers: HashMap<Uuid, AnswerValue>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current answer for a question, replacing any previous one
    pub fn set(&mut self, question_id: Uuid, value: AnswerValue) {
        self.answers.insert(question_id, value);
    }

    /// Drop a question's answer entirely
    pub fn clear(&mut self, question_id: Uuid) {
        self.answers.remove(&question_id);
    }

    pub fn get(&self, question_id: Uuid) -> Option<&AnswerValue> {
        self.answers.get(&question_id)
    }

    /// A question counts as answered only with a non-empty value
    pub fn is_answered(&self, question_id: Uuid) -> bool {
        self.answers
            .get(&question_id)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Number of questions with a non-empty answer
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|v| !v.is_empty()).count()
    }

    /// Progress across the whole survey (0.0 - 100.0), answer-driven: it can
    /// regress when an answer is cleared, independent of step position.
    pub fn progress_percent(&self, total_questions: usize) -> f64 {
        if total_questions == 0 {
            0.0
        } else {
            (self.answered_count() as f64 / total_questions as f64) * 100.0
        }
    }

    /// The non-empty answers, for submission. Unanswered or emptied
    /// questions are omitted, never written as empty rows.
    pub fn valid_answers(&self) -> impl Iterator<Item = (Uuid, &AnswerValue)> {
        self.answers
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(id, v)| (*id, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_do_not_count_as_answered() {
        let mut store = AnswerStore::new();
        let q = Uuid::new_v4();

        store.set(q, AnswerValue::Text("  ".to_string()));
        assert!(!store.is_answered(q));

        store.set(q, AnswerValue::Text("4".to_string()));
        assert!(store.is_answered(q));
    }

    #[test]
    fn progress_regresses_when_answer_cleared() {
        let mut store = AnswerStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.set(a, AnswerValue::Text("yes".to_string()));
        store.set(b, AnswerValue::Multi(vec!["x".to_string()]));
        assert_eq!(store.progress_percent(4), 50.0);

        store.clear(b);
        assert_eq!(store.progress_percent(4), 25.0);

        // Overwriting with an empty value regresses the same way
        store.set(a, AnswerValue::Text(String::new()));
        assert_eq!(store.progress_percent(4), 0.0);
    }

    #[test]
    fn progress_of_empty_survey_is_zero() {
        let store = AnswerStore::new();
        assert_eq!(store.progress_percent(0), 0.0);
    }

    #[test]
    fn valid_answers_omit_empty_values() {
        let mut store = AnswerStore::new();
        let answered = Uuid::new_v4();
        let blank = Uuid::new_v4();

        store.set(answered, AnswerValue::Text("fine".to_string()));
        store.set(blank, AnswerValue::Text("   ".to_string()));

        let ids: Vec<Uuid> = store.valid_answers().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![answered]);
    }
}
