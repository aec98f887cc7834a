//! Submission pipeline tests
//!
//! Exercise the pipeline against mock collaborators: the single timeout
//! retry, failure handling on each pipeline stage, best-effort completion
//! marking, and idempotence through the replay guard.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opine_common::db::{
    AnswerRow, AnswerValue, GroupingMode, Question, QuestionKind, QuestionOptions, Survey,
    SurveyStatus,
};
use opine_common::{Error, Result};
use uuid::Uuid;

use opine_rw::wizard::{
    ReplayGuard, ResponseWriter, SessionManager, SubmissionPipeline, SubmitError, SurveySnapshot,
    WizardEngine, WizardPhase,
};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingWriter {
    create_calls: AtomicUsize,
    write_calls: AtomicUsize,
    /// Number of leading bulk-write attempts that fail with a timeout
    timeouts_remaining: AtomicUsize,
    fail_create: AtomicBool,
    fail_write_other: AtomicBool,
    written: Mutex<Vec<AnswerRow>>,
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    async fn create_response(&self, _survey_id: Uuid) -> Result<Uuid> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Internal("create rejected".to_string()));
        }
        Ok(Uuid::new_v4())
    }

    async fn bulk_write_answers(&self, _response_id: Uuid, rows: Vec<AnswerRow>) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        if self.timeouts_remaining.load(Ordering::SeqCst) > 0 {
            self.timeouts_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Timeout("injected timeout".to_string()));
        }
        if self.fail_write_other.load(Ordering::SeqCst) {
            return Err(Error::Internal("write rejected".to_string()));
        }

        self.written.lock().unwrap().extend(rows);
        Ok(())
    }
}

#[derive(Default)]
struct StubSessions {
    fail_mark: AtomicBool,
    mark_calls: AtomicUsize,
    completions: Mutex<Vec<(Uuid, String)>>,
}

#[async_trait]
impl SessionManager for StubSessions {
    async fn is_completed(&self, survey_id: Uuid, respondent: &str) -> Result<bool> {
        Ok(self
            .completions
            .lock()
            .unwrap()
            .contains(&(survey_id, respondent.to_string())))
    }

    async fn mark_completed(&self, survey_id: Uuid, respondent: &str) -> Result<()> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(Error::Internal("participation store down".to_string()));
        }
        self.completions
            .lock()
            .unwrap()
            .push((survey_id, respondent.to_string()));
        Ok(())
    }

    async fn validate_token(&self, _survey_id: Uuid, _code: &str) -> Result<bool> {
        Ok(true)
    }

    async fn consume_token(&self, _survey_id: Uuid, _code: &str) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn single_step_snapshot() -> SurveySnapshot {
    let survey_id = Uuid::new_v4();
    SurveySnapshot {
        survey: Survey {
            id: survey_id,
            title: "Feedback".to_string(),
            description: None,
            status: SurveyStatus::Active,
            starts_at: None,
            ends_at: None,
            template_id: None,
            default_instructor_id: None,
            grouping: GroupingMode::Flat,
            access_code_required: false,
        },
        questions: vec![
            Question {
                id: Uuid::new_v4(),
                survey_id,
                text: "Overall rating".to_string(),
                kind: QuestionKind::Rating,
                is_required: true,
                order_index: 0,
                section_id: None,
                session_id: None,
                category: None,
                options: QuestionOptions::default(),
            },
            Question {
                id: Uuid::new_v4(),
                survey_id,
                text: "Optional remark".to_string(),
                kind: QuestionKind::Rating,
                is_required: false,
                order_index: 1,
                section_id: None,
                session_id: None,
                category: None,
                options: QuestionOptions::default(),
            },
        ],
        sections: vec![],
        bindings: vec![],
        default_instructor: None,
    }
}

/// Engine answered and standing on its final (only) step
fn engine_at_final_step() -> WizardEngine {
    let snapshot = single_step_snapshot();
    let required = snapshot.questions[0].id;

    let mut engine = WizardEngine::new(snapshot, "resp-1".to_string());
    engine.start().unwrap();
    engine
        .set_answer(required, Some(AnswerValue::Text("4".to_string())))
        .unwrap();
    engine
}

fn pipeline(
    writer: &Arc<RecordingWriter>,
    sessions: &Arc<StubSessions>,
    guard: &ReplayGuard,
) -> SubmissionPipeline {
    SubmissionPipeline::new(writer.clone(), sessions.clone(), guard.clone(), 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_submission_writes_one_batch_and_completes() {
    let writer = Arc::new(RecordingWriter::default());
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();
    let survey_id = engine.survey().id;

    let response_id = pipeline(&writer, &sessions, &guard)
        .submit(&mut engine)
        .await
        .unwrap();

    assert_eq!(writer.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(writer.write_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.phase(), WizardPhase::Completed);
    assert!(!engine.is_submitting());
    assert!(guard.is_completed(survey_id, "resp-1").await);

    // Only the answered question is persisted; the optional blank one is
    // omitted entirely
    let written = writer.written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].response_id, response_id);
    assert_eq!(written[0].value, "4");
}

#[tokio::test]
async fn timeout_then_success_yields_one_response_and_completes() {
    let writer = Arc::new(RecordingWriter::default());
    writer.timeouts_remaining.store(1, Ordering::SeqCst);
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();

    let result = pipeline(&writer, &sessions, &guard).submit(&mut engine).await;

    assert!(result.is_ok());
    assert_eq!(writer.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(writer.write_calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.phase(), WizardPhase::Completed);
}

#[tokio::test]
async fn second_timeout_aborts_and_preserves_answers() {
    let writer = Arc::new(RecordingWriter::default());
    writer.timeouts_remaining.store(2, Ordering::SeqCst);
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();
    let survey_id = engine.survey().id;

    let err = pipeline(&writer, &sessions, &guard)
        .submit(&mut engine)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::WriteFailed(_)));
    // Exactly one retry, no more
    assert_eq!(writer.write_calls.load(Ordering::SeqCst), 2);
    // Respondent stays on the last step with answers intact, free to retry
    assert_eq!(engine.phase(), WizardPhase::Answering { step: 0 });
    assert!(!engine.is_submitting());
    assert_eq!(engine.answers().answered_count(), 1);
    assert!(!guard.is_completed(survey_id, "resp-1").await);
    assert_eq!(sessions.mark_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_timeout_write_failure_is_not_retried() {
    let writer = Arc::new(RecordingWriter::default());
    writer.fail_write_other.store(true, Ordering::SeqCst);
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();

    let err = pipeline(&writer, &sessions, &guard)
        .submit(&mut engine)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::WriteFailed(_)));
    assert_eq!(writer.write_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.phase(), WizardPhase::Answering { step: 0 });
}

#[tokio::test]
async fn create_failure_aborts_before_any_write() {
    let writer = Arc::new(RecordingWriter::default());
    writer.fail_create.store(true, Ordering::SeqCst);
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();

    let err = pipeline(&writer, &sessions, &guard)
        .submit(&mut engine)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::CreateFailed(_)));
    assert_eq!(writer.write_calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.phase(), WizardPhase::Answering { step: 0 });
}

#[tokio::test]
async fn completion_mark_failure_does_not_fail_submission() {
    let writer = Arc::new(RecordingWriter::default());
    let sessions = Arc::new(StubSessions::default());
    sessions.fail_mark.store(true, Ordering::SeqCst);
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();
    let survey_id = engine.survey().id;

    let result = pipeline(&writer, &sessions, &guard).submit(&mut engine).await;

    assert!(result.is_ok());
    assert_eq!(engine.phase(), WizardPhase::Completed);
    // The local guard is recorded even though the server-side mark failed
    assert!(guard.is_completed(survey_id, "resp-1").await);
}

#[tokio::test]
async fn forced_second_submission_creates_no_second_response() {
    let writer = Arc::new(RecordingWriter::default());
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();
    let mut engine = engine_at_final_step();

    let p = pipeline(&writer, &sessions, &guard);
    p.submit(&mut engine).await.unwrap();

    let err = p.submit(&mut engine).await.unwrap_err();
    assert!(matches!(err, SubmitError::AlreadyCompleted));
    assert_eq!(writer.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(writer.write_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replay_guard_blocks_even_with_fresh_wizard_state() {
    let writer = Arc::new(RecordingWriter::default());
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();

    // First wizard session completes
    let mut first = engine_at_final_step();
    let survey_id = first.survey().id;
    let p = pipeline(&writer, &sessions, &guard);
    p.submit(&mut first).await.unwrap();

    // A second in-memory session for the same survey and respondent is
    // stopped by the guard before anything is written
    let mut snapshot = single_step_snapshot();
    snapshot.survey.id = survey_id;
    for q in &mut snapshot.questions {
        q.survey_id = survey_id;
    }
    let required = snapshot.questions[0].id;
    let mut second = WizardEngine::new(snapshot, "resp-1".to_string());
    second.start().unwrap();
    second
        .set_answer(required, Some(AnswerValue::Text("5".to_string())))
        .unwrap();

    let err = p.submit(&mut second).await.unwrap_err();
    assert!(matches!(err, SubmitError::AlreadyCompleted));
    assert_eq!(writer.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn submission_with_unanswered_required_question_is_rejected() {
    let writer = Arc::new(RecordingWriter::default());
    let sessions = Arc::new(StubSessions::default());
    let guard = ReplayGuard::new();

    let snapshot = single_step_snapshot();
    let required = snapshot.questions[0].id;
    let mut engine = WizardEngine::new(snapshot, "resp-1".to_string());
    engine.start().unwrap();

    let err = pipeline(&writer, &sessions, &guard)
        .submit(&mut engine)
        .await
        .unwrap_err();

    match err {
        SubmitError::Validation(missing) => assert_eq!(missing, vec![required]),
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert_eq!(writer.create_calls.load(Ordering::SeqCst), 0);
}
