//! Respondent wizard API
//!
//! Thin mapping glue between HTTP and the wizard engine. The access gate
//! runs when a wizard is opened; everything after that is a lookup into the
//! in-memory session registry plus one engine operation.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use opine_common::db::{
    AnswerValue, InstructorRef, QuestionKind, QuestionOptions,
};
use opine_common::Error;

use crate::wizard::{Advance, EngineError, SubmitError, WizardEngine, WizardPhase};
use crate::AppState;

/// Header carrying the anonymous per-browser respondent identity
const RESPONDENT_HEADER: &str = "x-respondent-token";

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct OpenWizardRequest {
    /// One-time participation code, when the survey requires one
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// New answer value; `null` clears the answer
    pub value: Option<AnswerValue>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub progress_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct SurveySummary {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub kind: QuestionKind,
    pub is_required: bool,
    pub options: QuestionOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerValue>,
}

#[derive(Debug, Serialize)]
pub struct StepView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<InstructorRef>,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub struct WizardView {
    pub wizard_id: Uuid,
    pub respondent: String,
    pub survey: SurveySummary,
    #[serde(flatten)]
    pub phase: WizardPhase,
    pub step_count: usize,
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<Uuid>,
}

fn render_view(wizard_id: Uuid, engine: &WizardEngine) -> WizardView {
    let current_step = match engine.phase() {
        WizardPhase::Answering { .. } => Some(StepView {
            title: engine.current_title().map(str::to_string),
            instructor: engine.current_instructor().cloned(),
            questions: engine
                .current_questions()
                .iter()
                .map(|q| QuestionView {
                    id: q.id,
                    text: q.text.clone(),
                    kind: q.kind,
                    is_required: q.is_required,
                    options: q.options.clone(),
                    answer: engine.answers().get(q.id).cloned(),
                })
                .collect(),
        }),
        _ => None,
    };

    WizardView {
        wizard_id,
        respondent: engine.respondent().to_string(),
        survey: SurveySummary {
            id: engine.survey().id,
            title: engine.survey().title.clone(),
            description: engine.survey().description.clone(),
        },
        phase: engine.phase(),
        step_count: engine.step_count(),
        progress_percent: engine.progress_percent(),
        current_step,
        response_id: None,
    }
}

/// Anonymous identity: read the client's token, or issue a fresh one that
/// the response echoes back for the client to keep.
fn respondent_identity(headers: &HeaderMap) -> String {
    headers
        .get(RESPONDENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/surveys/:survey_id/wizard
///
/// Runs the access gate and opens a new wizard session for the respondent.
pub async fn open_wizard(
    State(state): State<AppState>,
    Path(survey_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<OpenWizardRequest>>,
) -> Result<Json<WizardView>, ApiError> {
    let respondent = respondent_identity(&headers);
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let snapshot = state
        .loader
        .load(survey_id)
        .await
        .map_err(ApiError::from_load)?;

    // Access gate: open window, prior completion, participation code
    let now = Utc::now();
    if !snapshot.survey.is_open(now) {
        return Err(if snapshot.survey.not_yet_open(now) {
            ApiError::NotYetOpen
        } else {
            ApiError::Closed
        });
    }

    // Prior completion short-circuits the machine before intro/answering is
    // ever entered: the session opens directly in its terminal state.
    let locally_done = state.guard.is_completed(survey_id, &respondent).await;
    let remotely_done = state
        .sessions
        .is_completed(survey_id, &respondent)
        .await
        .map_err(ApiError::from_load)?;
    if locally_done || remotely_done {
        let engine = WizardEngine::new_already_completed(snapshot, respondent);
        let wizard_id = state.registry.insert(engine).await;
        let cell = state
            .registry
            .get(wizard_id)
            .await
            .ok_or_else(|| ApiError::Internal("wizard session vanished".to_string()))?;
        let engine = cell.lock().await;
        return Ok(Json(render_view(wizard_id, &engine)));
    }

    if snapshot.survey.access_code_required {
        let code = request.code.as_deref().unwrap_or("");
        let valid = state
            .sessions
            .validate_token(survey_id, code)
            .await
            .map_err(ApiError::from_load)?;
        if !valid {
            return Err(ApiError::InvalidCode);
        }
        // Burn the code only now that the wizard actually opens
        state
            .sessions
            .consume_token(survey_id, code)
            .await
            .map_err(ApiError::from_load)?;
    }

    let engine = WizardEngine::new(snapshot, respondent);
    let wizard_id = state.registry.insert(engine).await;

    info!(survey_id = %survey_id, wizard_id = %wizard_id, "Opened wizard session");

    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or_else(|| ApiError::Internal("wizard session vanished".to_string()))?;
    let engine = cell.lock().await;
    Ok(Json(render_view(wizard_id, &engine)))
}

/// GET /api/wizard/:wizard_id
pub async fn wizard_view(
    State(state): State<AppState>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or(ApiError::WizardNotFound)?;
    let engine = cell.lock().await;
    Ok(Json(render_view(wizard_id, &engine)))
}

/// POST /api/wizard/:wizard_id/start
pub async fn start_wizard(
    State(state): State<AppState>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or(ApiError::WizardNotFound)?;
    let mut engine = cell.lock().await;
    engine.start()?;
    Ok(Json(render_view(wizard_id, &engine)))
}

/// PUT /api/wizard/:wizard_id/answers/:question_id
pub async fn put_answer(
    State(state): State<AppState>,
    Path((wizard_id, question_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or(ApiError::WizardNotFound)?;
    let mut engine = cell.lock().await;
    engine.set_answer(question_id, request.value)?;
    Ok(Json(AnswerResponse {
        progress_percent: engine.progress_percent(),
    }))
}

/// POST /api/wizard/:wizard_id/next
///
/// Advances one step; past the last step this triggers the submission
/// pipeline instead.
pub async fn next_step(
    State(state): State<AppState>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or(ApiError::WizardNotFound)?;
    let mut engine = cell.lock().await;

    match engine.next()? {
        Advance::Moved(_) => Ok(Json(render_view(wizard_id, &engine))),
        Advance::AtEnd => {
            let response_id = state.pipeline.submit(&mut engine).await?;
            let mut view = render_view(wizard_id, &engine);
            view.response_id = Some(response_id);
            Ok(Json(view))
        }
    }
}

/// POST /api/wizard/:wizard_id/previous
pub async fn previous_step(
    State(state): State<AppState>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or(ApiError::WizardNotFound)?;
    let mut engine = cell.lock().await;
    engine.previous()?;
    Ok(Json(render_view(wizard_id, &engine)))
}

/// POST /api/wizard/:wizard_id/submit
pub async fn submit_wizard(
    State(state): State<AppState>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<WizardView>, ApiError> {
    let cell = state
        .registry
        .get(wizard_id)
        .await
        .ok_or(ApiError::WizardNotFound)?;
    let mut engine = cell.lock().await;

    let response_id = state.pipeline.submit(&mut engine).await?;
    let mut view = render_view(wizard_id, &engine);
    view.response_id = Some(response_id);
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wizard API errors, one variant per screen the respondent can land on
#[derive(Debug)]
pub enum ApiError {
    SurveyNotFound,
    WizardNotFound,
    NotYetOpen,
    Closed,
    InvalidCode,
    AlreadyCompleted,
    /// Transient load failure; the respondent may retry
    Load(String),
    /// Required questions on the current step are unanswered
    Validation(Vec<Uuid>),
    /// Operation does not fit the wizard's current phase
    InvalidState(String),
    /// Submission failed after the permitted retry; resubmission allowed
    SubmitFailed(String),
    Internal(String),
}

impl ApiError {
    /// Loader outcomes: a missing survey is navigable-away, anything else
    /// is retryable.
    fn from_load(err: Error) -> Self {
        match err {
            Error::NotFound(_) => ApiError::SurveyNotFound,
            other => ApiError::Load(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(missing) => ApiError::Validation(missing),
            EngineError::SubmissionInFlight => {
                ApiError::InvalidState("a submission is already in flight".to_string())
            }
            EngineError::Terminal => ApiError::InvalidState("wizard already finished".to_string()),
            EngineError::NotAtIntro => {
                ApiError::InvalidState("wizard already started".to_string())
            }
            EngineError::NotAnswering => {
                ApiError::InvalidState("wizard is not on a question step".to_string())
            }
            EngineError::UnknownQuestion(id) => {
                ApiError::InvalidState(format!("question {} is not part of this survey", id))
            }
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::AlreadyCompleted => ApiError::AlreadyCompleted,
            SubmitError::State(engine_err) => engine_err.into(),
            SubmitError::Validation(missing) => ApiError::Validation(missing),
            SubmitError::CreateFailed(e) | SubmitError::WriteFailed(e) => {
                ApiError::SubmitFailed(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::SurveyNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "survey_not_found" }),
            ),
            ApiError::WizardNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "wizard_not_found" }),
            ),
            ApiError::NotYetOpen => (StatusCode::FORBIDDEN, json!({ "error": "not_yet_open" })),
            ApiError::Closed => (StatusCode::FORBIDDEN, json!({ "error": "closed" })),
            ApiError::InvalidCode => (StatusCode::FORBIDDEN, json!({ "error": "invalid_code" })),
            ApiError::AlreadyCompleted => (
                StatusCode::CONFLICT,
                json!({ "error": "already_completed" }),
            ),
            ApiError::Load(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "load_error", "message": message, "retryable": true }),
            ),
            ApiError::Validation(missing) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "validation_failed", "missing": missing }),
            ),
            ApiError::InvalidState(message) => (
                StatusCode::CONFLICT,
                json!({ "error": "invalid_state", "message": message }),
            ),
            ApiError::SubmitFailed(message) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "submission_failed", "message": message, "retryable": true }),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal", "message": message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
