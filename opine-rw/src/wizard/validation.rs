//! Step-local answer validation

use opine_common::db::Question;
use uuid::Uuid;

use super::answers::AnswerStore;

/// Check the questions of one step against the answer store.
///
/// A required question fails when its answer is absent, blank after
/// trimming, or an empty list. Returns the offending question ids; the
/// caller blocks the step transition but never touches entered answers.
pub fn validate_step(step: &[Question], answers: &AnswerStore) -> Result<(), Vec<Uuid>> {
    let missing: Vec<Uuid> = step
        .iter()
        .filter(|q| q.is_required && !answers.is_answered(q.id))
        .map(|q| q.id)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
