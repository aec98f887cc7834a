//! Wizard phase state

use serde::Serialize;

/// The respondent's journey through one survey.
///
/// The step index only exists while answering, so combinations like
/// "submitting from the intro screen" are unrepresentable. The in-flight
/// submission flag lives next to the phase in the engine, orthogonal to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardPhase {
    /// Survey title/description shown, wizard not yet started
    Intro,
    /// Stepping through the wizard pages
    Answering { step: usize },
    /// Submission succeeded this session
    Completed,
    /// The session manager reported prior completion at load time; the
    /// wizard was never entered
    AlreadyCompleted,
}

impl WizardPhase {
    /// Current step index, when answering
    pub fn step_index(&self) -> Option<usize> {
        match self {
            WizardPhase::Answering { step } => Some(*step),
            _ => None,
        }
    }

    /// Terminal phases admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardPhase::Completed | WizardPhase::AlreadyCompleted)
    }
}

impl std::fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardPhase::Intro => write!(f, "intro"),
            WizardPhase::Answering { step } => write!(f, "answering[{}]", step),
            WizardPhase::Completed => write!(f, "completed"),
            WizardPhase::AlreadyCompleted => write!(f, "already_completed"),
        }
    }
}
