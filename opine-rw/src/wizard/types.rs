//! Wizard data types

use opine_common::db::{InstructorRef, Question, Section, SessionBinding, Survey};

/// One page of the wizard: an ordered run of questions shown together
pub type Step = Vec<Question>;

/// Everything the wizard needs about one survey, loaded once at entry.
///
/// Questions are in `order_index` order; bindings are in `position` order.
#[derive(Debug, Clone)]
pub struct SurveySnapshot {
    pub survey: Survey,
    pub questions: Vec<Question>,
    pub sections: Vec<Section>,
    pub bindings: Vec<SessionBinding>,
    /// The survey's explicit default instructor, resolved to a display ref
    pub default_instructor: Option<InstructorRef>,
}
