//! Local replay guard
//!
//! Fast-path idempotence layer keyed by (survey, respondent identity). The
//! server-side participation record is the authoritative layer; this one is
//! recorded unconditionally after a successful submission so a respondent
//! cannot double-submit through the same process even if the server-side
//! mark silently failed.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ReplayGuard {
    completed: Arc<RwLock<HashSet<(Uuid, String)>>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record completion for this identity; infallible by design
    pub async fn record(&self, survey_id: Uuid, respondent: &str) {
        self.completed
            .write()
            .await
            .insert((survey_id, respondent.to_string()));
    }

    pub async fn is_completed(&self, survey_id: Uuid, respondent: &str) -> bool {
        self.completed
            .read()
            .await
            .contains(&(survey_id, respondent.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_per_survey_and_respondent() {
        let guard = ReplayGuard::new();
        let survey = Uuid::new_v4();

        assert!(!guard.is_completed(survey, "r1").await);
        guard.record(survey, "r1").await;

        assert!(guard.is_completed(survey, "r1").await);
        assert!(!guard.is_completed(survey, "r2").await);
        assert!(!guard.is_completed(Uuid::new_v4(), "r1").await);
    }
}
