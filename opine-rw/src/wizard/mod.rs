//! Respondent survey wizard
//!
//! Turns a survey's flat question list into a multi-step wizard, tracks the
//! respondent's phase and in-memory answers, resolves per-step instructor
//! context, and submits answers transactionally with a single timeout retry.

pub mod answers;
pub mod context;
pub mod engine;
pub mod grouping;
pub mod replay;
pub mod state;
pub mod submission;
pub mod traits;
pub mod types;
pub mod validation;

pub use answers::AnswerStore;
pub use engine::{Advance, EngineError, WizardEngine};
pub use grouping::group;
pub use replay::ReplayGuard;
pub use state::WizardPhase;
pub use submission::{SubmissionPipeline, SubmitError};
pub use traits::{ResponseWriter, SessionManager, SurveyLoader};
pub use types::{Step, SurveySnapshot};
