//! Collaborator seams consumed by the wizard engine
//!
//! Production implementations live in `crate::db`; tests substitute mocks.

use async_trait::async_trait;
use opine_common::Result;
use opine_common::db::AnswerRow;
use uuid::Uuid;

use super::types::SurveySnapshot;

/// Loads one survey with its questions, sections, and instructor bindings.
///
/// A missing survey is reported as `Error::NotFound`; any other failure is a
/// transient load error the caller may retry.
#[async_trait]
pub trait SurveyLoader: Send + Sync {
    async fn load(&self, survey_id: Uuid) -> Result<SurveySnapshot>;
}

/// Anonymous participation records and one-time access codes.
///
/// The respondent identity is an opaque per-browser token; no personal data
/// is attached to it.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Whether this identity already completed the survey (server-side record)
    async fn is_completed(&self, survey_id: Uuid, respondent: &str) -> Result<bool>;

    /// Record completion for this identity
    async fn mark_completed(&self, survey_id: Uuid, respondent: &str) -> Result<()>;

    /// Whether `code` is a valid, unused participation code for the survey
    async fn validate_token(&self, survey_id: Uuid, code: &str) -> Result<bool>;

    /// Burn a one-time code. Called only once the wizard actually opens, so a
    /// failed load does not consume the code.
    async fn consume_token(&self, survey_id: Uuid, code: &str) -> Result<()>;
}

/// Persistence for submitted responses.
#[async_trait]
pub trait ResponseWriter: Send + Sync {
    /// Create the response record a submission's answers hang off of
    async fn create_response(&self, survey_id: Uuid) -> Result<Uuid>;

    /// Write all answers for one response as a single atomic batch.
    ///
    /// Transient failures surface as `Error::Timeout` so the submission
    /// pipeline can retry the whole batch.
    async fn bulk_write_answers(&self, response_id: Uuid, rows: Vec<AnswerRow>) -> Result<()>;
}
