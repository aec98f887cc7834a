//! Submission pipeline
//!
//! Drains the wizard's answer store through validation and persistence:
//! create the response record, bulk-write valid answers with a single
//! timeout retry, record completion, and move the wizard to its terminal
//! phase. Every failure path leaves the respondent on the last step with
//! answers intact.

use std::sync::Arc;

use opine_common::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::engine::{EngineError, WizardEngine};
use super::replay::ReplayGuard;
use super::traits::{ResponseWriter, SessionManager};
use crate::util::retry::retry_once_on_timeout;

/// Submission failures, in taxonomy order
#[derive(Debug)]
pub enum SubmitError {
    /// Completion is already recorded for this respondent; no second
    /// response record may be created
    AlreadyCompleted,
    /// Wizard is not on its final step, or another submission is in flight
    State(EngineError),
    /// Required questions on the final step are unanswered
    Validation(Vec<Uuid>),
    /// Creating the response record failed; nothing was written
    CreateFailed(Error),
    /// The answer batch failed (after the one permitted retry for timeouts)
    WriteFailed(Error),
}

/// Runs the submission flow against one wizard session.
pub struct SubmissionPipeline {
    writer: Arc<dyn ResponseWriter>,
    sessions: Arc<dyn SessionManager>,
    guard: ReplayGuard,
    retry_delay_ms: u64,
}

impl SubmissionPipeline {
    pub fn new(
        writer: Arc<dyn ResponseWriter>,
        sessions: Arc<dyn SessionManager>,
        guard: ReplayGuard,
        retry_delay_ms: u64,
    ) -> Self {
        Self {
            writer,
            sessions,
            guard,
            retry_delay_ms,
        }
    }

    /// Submit the wizard's answers. On success the wizard is `Completed`
    /// and the created response id is returned.
    pub async fn submit(&self, wizard: &mut WizardEngine) -> Result<Uuid, SubmitError> {
        let survey_id = wizard.survey().id;
        let respondent = wizard.respondent().to_string();

        // The replay guard is checked before anything is written: once
        // completion is recorded, no second response record may exist for
        // this identity.
        if wizard.phase().is_terminal() || self.guard.is_completed(survey_id, &respondent).await {
            return Err(SubmitError::AlreadyCompleted);
        }

        wizard.begin_submission().map_err(|err| match err {
            EngineError::Validation(missing) => SubmitError::Validation(missing),
            other => SubmitError::State(other),
        })?;

        // 1. Response record first; answers hang off it
        let response_id = match self.writer.create_response(survey_id).await {
            Ok(id) => id,
            Err(err) => {
                warn!(survey_id = %survey_id, error = %err, "Failed to create response record");
                wizard.fail_submission();
                return Err(SubmitError::CreateFailed(err));
            }
        };

        // 2-4. One atomic batch of the valid answers, retried once on timeout
        let rows = wizard.answer_rows(response_id);
        let row_count = rows.len();
        let write_result = retry_once_on_timeout("bulk answer write", self.retry_delay_ms, || {
            let rows = rows.clone();
            async move { self.writer.bulk_write_answers(response_id, rows).await }
        })
        .await;

        if let Err(err) = write_result {
            warn!(
                survey_id = %survey_id,
                response_id = %response_id,
                error = %err,
                "Answer batch failed; respondent stays on the final step"
            );
            wizard.fail_submission();
            return Err(SubmitError::WriteFailed(err));
        }

        // 5. Server-side completion mark is best-effort: the local replay
        // guard below covers the common case when it fails.
        if let Err(err) = self.sessions.mark_completed(survey_id, &respondent).await {
            warn!(
                survey_id = %survey_id,
                error = %err,
                "Failed to record server-side completion; local replay guard still applies"
            );
        }

        // 6. Local guard is recorded unconditionally, then the phase flips
        self.guard.record(survey_id, &respondent).await;
        wizard.complete_submission();

        info!(
            survey_id = %survey_id,
            response_id = %response_id,
            answers = row_count,
            "Survey submission completed"
        );
        Ok(response_id)
    }
}
