//! Wizard engine: phase transitions, step navigation, and answer editing
//! for one respondent's pass through one survey.
//!
//! All state here is in-memory and scoped to a single wizard session. A
//! respondent who loses the session starts the wizard over; only completion
//! is durable, via the session manager and replay guard.

use std::collections::HashMap;

use opine_common::db::{
    AnswerRow, AnswerValue, GroupingMode, InstructorRef, Survey,
};
use tracing::debug;
use uuid::Uuid;

use super::answers::AnswerStore;
use super::context;
use super::grouping;
use super::state::WizardPhase;
use super::types::{Step, SurveySnapshot};
use super::validation;

/// Outcome of a "next" action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the given step index
    Moved(usize),
    /// Already on the final step; the caller should run the submission
    /// pipeline instead
    AtEnd,
}

/// Engine operation failures; all leave the wizard state untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Operation requires the intro phase
    NotAtIntro,
    /// Operation requires the answering phase
    NotAnswering,
    /// The wizard already finished
    Terminal,
    /// Question id does not belong to this survey
    UnknownQuestion(Uuid),
    /// Required questions on the current step are unanswered
    Validation(Vec<Uuid>),
    /// A submission is in flight; the action is disabled for its duration
    SubmissionInFlight,
}

#[derive(Debug)]
pub struct WizardEngine {
    survey: Survey,
    steps: Vec<Step>,
    step_instructors: Vec<Option<InstructorRef>>,
    step_titles: Vec<Option<String>>,
    question_texts: HashMap<Uuid, String>,
    total_questions: usize,
    answers: AnswerStore,
    phase: WizardPhase,
    submitting: bool,
    respondent: String,
}

impl WizardEngine {
    /// Build the wizard from a loaded snapshot: compute the step sequence,
    /// pre-resolve per-step instructor context, and enter the initial phase.
    ///
    /// The per-session variant has no intro screen and starts answering
    /// immediately.
    pub fn new(snapshot: SurveySnapshot, respondent: String) -> Self {
        let steps = grouping::group(
            &snapshot.questions,
            &snapshot.bindings,
            snapshot.survey.grouping,
        );

        let aggregate =
            context::aggregate_instructor(&snapshot.bindings, snapshot.default_instructor.clone());
        let step_instructors =
            context::resolve_step_instructors(&steps, &snapshot.bindings, aggregate);

        let sections: HashMap<Uuid, String> = snapshot
            .sections
            .iter()
            .map(|s| (s.id, s.name.clone()))
            .collect();
        let step_titles = steps
            .iter()
            .map(|step| {
                step.first()
                    .and_then(|q| q.section_id)
                    .and_then(|sid| sections.get(&sid).cloned())
            })
            .collect();

        let question_texts = snapshot
            .questions
            .iter()
            .map(|q| (q.id, q.text.clone()))
            .collect();

        let phase = match snapshot.survey.grouping {
            GroupingMode::Flat => WizardPhase::Intro,
            GroupingMode::PerSession => WizardPhase::Answering { step: 0 },
        };
        Self::with_phase(snapshot, steps, step_instructors, step_titles, question_texts, respondent, phase)
    }

    /// Short-circuit constructor for a respondent whose completion is
    /// already on record: the wizard lands in its terminal state without
    /// ever entering intro or answering.
    pub fn new_already_completed(snapshot: SurveySnapshot, respondent: String) -> Self {
        let question_texts = snapshot
            .questions
            .iter()
            .map(|q| (q.id, q.text.clone()))
            .collect();
        Self::with_phase(
            snapshot,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            question_texts,
            respondent,
            WizardPhase::AlreadyCompleted,
        )
    }

    fn with_phase(
        snapshot: SurveySnapshot,
        steps: Vec<Step>,
        step_instructors: Vec<Option<InstructorRef>>,
        step_titles: Vec<Option<String>>,
        question_texts: HashMap<Uuid, String>,
        respondent: String,
        phase: WizardPhase,
    ) -> Self {
        debug!(
            survey_id = %snapshot.survey.id,
            steps = steps.len(),
            questions = snapshot.questions.len(),
            initial_phase = %phase,
            "Wizard session created"
        );

        Self {
            survey: snapshot.survey,
            steps,
            step_instructors,
            step_titles,
            question_texts,
            total_questions: snapshot.questions.len(),
            answers: AnswerStore::new(),
            phase,
            submitting: false,
            respondent,
        }
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn respondent(&self) -> &str {
        &self.respondent
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Questions of the active step; empty when not answering
    pub fn current_questions(&self) -> &[opine_common::db::Question] {
        match self.current_step_index() {
            Some(step) => &self.steps[step],
            None => &[],
        }
    }

    fn current_step_index(&self) -> Option<usize> {
        self.phase.step_index().filter(|&s| s < self.steps.len())
    }

    /// Instructor panel for the active step, from the pre-resolved table
    pub fn current_instructor(&self) -> Option<&InstructorRef> {
        self.current_step_index()
            .and_then(|s| self.step_instructors[s].as_ref())
    }

    /// Section title for the active step, when its questions carry one
    pub fn current_title(&self) -> Option<&str> {
        self.current_step_index()
            .and_then(|s| self.step_titles[s].as_deref())
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn progress_percent(&self) -> f64 {
        self.answers.progress_percent(self.total_questions)
    }

    /// Leave the intro screen and begin answering
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        match self.phase {
            WizardPhase::Intro => {
                self.phase = WizardPhase::Answering { step: 0 };
                Ok(())
            }
            _ => Err(EngineError::NotAtIntro),
        }
    }

    /// Record or clear one answer. Editing never fails validation; required
    /// checks happen on step transition only.
    pub fn set_answer(
        &mut self,
        question_id: Uuid,
        value: Option<AnswerValue>,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        if self.phase.step_index().is_none() {
            return Err(EngineError::NotAnswering);
        }
        if !self.question_texts.contains_key(&question_id) {
            return Err(EngineError::UnknownQuestion(question_id));
        }

        match value {
            Some(v) => self.answers.set(question_id, v),
            None => self.answers.clear(question_id),
        }
        Ok(())
    }

    /// Advance one step. The current step must validate; past the last step
    /// this reports `AtEnd` and the caller runs the submission pipeline.
    pub fn next(&mut self) -> Result<Advance, EngineError> {
        self.ensure_live()?;
        let step = self.phase.step_index().ok_or(EngineError::NotAnswering)?;

        self.validate_current_step()?;

        if step + 1 < self.steps.len() {
            self.phase = WizardPhase::Answering { step: step + 1 };
            Ok(Advance::Moved(step + 1))
        } else {
            Ok(Advance::AtEnd)
        }
    }

    /// Step back without validation, clamped at the first step
    pub fn previous(&mut self) -> Result<usize, EngineError> {
        self.ensure_live()?;
        let step = self.phase.step_index().ok_or(EngineError::NotAnswering)?;
        let target = step.saturating_sub(1);
        self.phase = WizardPhase::Answering { step: target };
        Ok(target)
    }

    /// Validate the active step only; future steps never block the present
    pub fn validate_current_step(&self) -> Result<(), EngineError> {
        match self.current_step_index() {
            Some(step) => validation::validate_step(&self.steps[step], &self.answers)
                .map_err(EngineError::Validation),
            None => Ok(()),
        }
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.phase.is_terminal() {
            return Err(EngineError::Terminal);
        }
        if self.submitting {
            return Err(EngineError::SubmissionInFlight);
        }
        Ok(())
    }

    /// Gate the submission pipeline: must be answering on the final step
    /// with that step valid, and no submission already in flight. Sets the
    /// in-flight flag, disabling every other action for the duration.
    pub(crate) fn begin_submission(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        let step = self.phase.step_index().ok_or(EngineError::NotAnswering)?;
        if !self.steps.is_empty() && step + 1 < self.steps.len() {
            return Err(EngineError::NotAnswering);
        }
        self.validate_current_step()?;
        self.submitting = true;
        Ok(())
    }

    /// A failed pipeline leaves the respondent on the last step with all
    /// answers intact, free to resubmit.
    pub(crate) fn fail_submission(&mut self) {
        self.submitting = false;
    }

    pub(crate) fn complete_submission(&mut self) {
        self.submitting = false;
        self.phase = WizardPhase::Completed;
    }

    /// Materialize the valid answers as persistence rows for one response
    pub(crate) fn answer_rows(&self, response_id: Uuid) -> Vec<AnswerRow> {
        self.answers
            .valid_answers()
            .map(|(question_id, value)| AnswerRow {
                response_id,
                question_id,
                question_text: self
                    .question_texts
                    .get(&question_id)
                    .cloned()
                    .unwrap_or_default(),
                value: value.to_storage(),
            })
            .collect()
    }
}
