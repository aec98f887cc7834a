//! Step context resolution
//!
//! Determines which instructor, if any, each wizard step is about. The whole
//! table is resolved once at load; step changes are then a plain index into
//! it instead of re-querying bindings from render paths.

use std::collections::HashMap;

use opine_common::db::{InstructorRef, SatisfactionCategory, SessionBinding};
use uuid::Uuid;

use super::types::Step;

/// The survey-level fallback instructor: session-level data wins when it
/// names a single instructor, otherwise the survey's explicit default.
pub fn aggregate_instructor(
    bindings: &[SessionBinding],
    default_instructor: Option<InstructorRef>,
) -> Option<InstructorRef> {
    let mut session_instructors: Vec<InstructorRef> = Vec::new();
    for binding in bindings {
        let instructor = InstructorRef {
            id: binding.instructor_id,
            name: binding.instructor_name.clone(),
        };
        if !session_instructors.contains(&instructor) {
            session_instructors.push(instructor);
        }
    }

    match session_instructors.len() {
        1 => session_instructors.pop(),
        _ => default_instructor,
    }
}

/// Build the per-step instructor lookup table.
///
/// A step whose first question evaluates an instructor and carries a session
/// binding resolves to that binding's instructor; every other step falls back
/// to the survey aggregate. `None` means no instructor panel for that step.
pub fn resolve_step_instructors(
    steps: &[Step],
    bindings: &[SessionBinding],
    aggregate: Option<InstructorRef>,
) -> Vec<Option<InstructorRef>> {
    let by_session: HashMap<Uuid, InstructorRef> = bindings
        .iter()
        .map(|b| {
            (
                b.id,
                InstructorRef {
                    id: b.instructor_id,
                    name: b.instructor_name.clone(),
                },
            )
        })
        .collect();

    steps
        .iter()
        .map(|step| {
            let first = match step.first() {
                Some(q) => q,
                None => return aggregate.clone(),
            };

            if first.category == Some(SatisfactionCategory::Instructor) {
                if let Some(bound) = first.session_id.and_then(|sid| by_session.get(&sid)) {
                    return Some(bound.clone());
                }
            }
            aggregate.clone()
        })
        .collect()
}
