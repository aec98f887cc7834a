//! Question grouping: partitions a survey's ordered question list into steps
//!
//! Pure and deterministic. Concatenating the produced steps in order always
//! reproduces the original `order_index` order; no question is dropped or
//! duplicated.

use std::collections::HashMap;

use opine_common::db::{GroupingMode, Question, QuestionKind, SatisfactionCategory, SessionBinding};
use uuid::Uuid;

use super::types::Step;

/// Hard page-size cap for steps of objective questions
const OBJECTIVE_STEP_CAP: usize = 7;

/// Hard page-size cap for steps of subjective questions
const SUBJECTIVE_STEP_CAP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    /// Choice, rating, and scale questions; dense pages
    Objective,
    /// Free-text questions; at most two per page
    Subjective,
    /// Anything else renders alone on its own step
    Standalone,
}

fn classify(kind: QuestionKind) -> Classification {
    match kind {
        QuestionKind::SingleChoice
        | QuestionKind::MultiChoice
        | QuestionKind::Rating
        | QuestionKind::Scale => Classification::Objective,
        QuestionKind::Text | QuestionKind::Textarea => Classification::Subjective,
        QuestionKind::Unknown => Classification::Standalone,
    }
}

/// Partition `questions` (already in `order_index` order) into wizard steps.
pub fn group(questions: &[Question], bindings: &[SessionBinding], mode: GroupingMode) -> Vec<Step> {
    match mode {
        GroupingMode::Flat => group_flat(questions),
        GroupingMode::PerSession => group_per_session(questions, bindings),
    }
}

/// Flat grouping: accumulate same-category runs into capped pages.
///
/// A category change always starts a fresh step. Objective and subjective
/// questions never share a step, and a switch between the two flushes the
/// other buffer so the original question order is preserved across steps.
fn group_flat(questions: &[Question]) -> Vec<Step> {
    let mut steps: Vec<Step> = Vec::new();
    let mut objective: Step = Vec::new();
    let mut subjective: Step = Vec::new();
    let mut current_category: Option<Option<SatisfactionCategory>> = None;

    for question in questions {
        // Category boundary: flush everything pending before adopting it
        if current_category.is_some() && current_category != Some(question.category) {
            flush(&mut steps, &mut objective);
            flush(&mut steps, &mut subjective);
        }
        current_category = Some(question.category);

        match classify(question.kind) {
            Classification::Objective => {
                flush(&mut steps, &mut subjective);
                objective.push(question.clone());
                if objective.len() >= OBJECTIVE_STEP_CAP {
                    flush(&mut steps, &mut objective);
                }
            }
            Classification::Subjective => {
                flush(&mut steps, &mut objective);
                subjective.push(question.clone());
                if subjective.len() >= SUBJECTIVE_STEP_CAP {
                    flush(&mut steps, &mut subjective);
                }
            }
            Classification::Standalone => {
                flush(&mut steps, &mut objective);
                flush(&mut steps, &mut subjective);
                steps.push(vec![question.clone()]);
            }
        }
    }

    flush(&mut steps, &mut objective);
    flush(&mut steps, &mut subjective);
    steps
}

fn flush(steps: &mut Vec<Step>, buffer: &mut Step) {
    if !buffer.is_empty() {
        steps.push(std::mem::take(buffer));
    }
}

/// Per-session grouping: one question per step, ordered by the position of
/// the session binding each question belongs to, then by `order_index`.
/// Questions without a session binding come after all session-bound ones.
fn group_per_session(questions: &[Question], bindings: &[SessionBinding]) -> Vec<Step> {
    let positions: HashMap<Uuid, i64> = bindings.iter().map(|b| (b.id, b.position)).collect();

    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|q| {
        match q.session_id.and_then(|sid| positions.get(&sid).copied()) {
            Some(position) => (0, position, q.order_index),
            None => (1, 0, q.order_index),
        }
    });

    ordered.into_iter().map(|q| vec![q.clone()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opine_common::db::QuestionOptions;

    fn question(
        order_index: i64,
        kind: QuestionKind,
        category: Option<SatisfactionCategory>,
    ) -> Question {
        Question {
            id: Uuid::new_v4(),
            survey_id: Uuid::nil(),
            text: format!("question {}", order_index),
            kind,
            is_required: false,
            order_index,
            section_id: None,
            session_id: None,
            category,
            options: QuestionOptions::default(),
        }
    }

    fn binding(position: i64) -> SessionBinding {
        SessionBinding {
            id: Uuid::new_v4(),
            survey_id: Uuid::nil(),
            position,
            course_id: Uuid::new_v4(),
            course_name: "Course".to_string(),
            instructor_id: Uuid::new_v4(),
            instructor_name: "Instructor".to_string(),
        }
    }

    fn flatten(steps: &[Step]) -> Vec<i64> {
        steps
            .iter()
            .flat_map(|s| s.iter().map(|q| q.order_index))
            .collect()
    }

    #[test]
    fn empty_input_yields_zero_steps() {
        assert!(group_flat(&[]).is_empty());
    }

    #[test]
    fn category_switch_forces_boundary_before_caps() {
        // rating/course, rating/course, text/course, rating/instructor
        // groups as [[A,B], [C], [D]]
        let questions = vec![
            question(0, QuestionKind::Rating, Some(SatisfactionCategory::Course)),
            question(1, QuestionKind::Rating, Some(SatisfactionCategory::Course)),
            question(2, QuestionKind::Text, Some(SatisfactionCategory::Course)),
            question(
                3,
                QuestionKind::Rating,
                Some(SatisfactionCategory::Instructor),
            ),
        ];

        let steps = group_flat(&questions);
        let shape: Vec<Vec<i64>> = steps
            .iter()
            .map(|s| s.iter().map(|q| q.order_index).collect())
            .collect();
        assert_eq!(shape, vec![vec![0, 1], vec![2], vec![3]]);
    }

    #[test]
    fn objective_cap_splits_at_seven() {
        // 9 objective questions with no category: [[q1..q7], [q8, q9]]
        let questions: Vec<Question> = (0..9)
            .map(|i| question(i, QuestionKind::SingleChoice, None))
            .collect();

        let steps = group_flat(&questions);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].len(), 7);
        assert_eq!(steps[1].len(), 2);
    }

    #[test]
    fn subjective_cap_splits_at_two() {
        let questions: Vec<Question> = (0..5)
            .map(|i| question(i, QuestionKind::Textarea, None))
            .collect();

        let steps = group_flat(&questions);
        assert_eq!(
            steps.iter().map(|s| s.len()).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
    }

    #[test]
    fn objective_and_subjective_never_share_a_step() {
        let questions = vec![
            question(0, QuestionKind::Rating, None),
            question(1, QuestionKind::Text, None),
            question(2, QuestionKind::Rating, None),
            question(3, QuestionKind::Scale, None),
        ];

        let steps = group_flat(&questions);
        for step in &steps {
            let objective = step
                .iter()
                .filter(|q| classify(q.kind) == Classification::Objective)
                .count();
            assert!(objective == 0 || objective == step.len());
        }
        assert_eq!(flatten(&steps), vec![0, 1, 2, 3]);
    }

    #[test]
    fn unknown_kind_is_flushed_alone() {
        let questions = vec![
            question(0, QuestionKind::Rating, None),
            question(1, QuestionKind::Unknown, None),
            question(2, QuestionKind::Rating, None),
        ];

        let steps = group_flat(&questions);
        let shape: Vec<Vec<i64>> = steps
            .iter()
            .map(|s| s.iter().map(|q| q.order_index).collect())
            .collect();
        assert_eq!(shape, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn flat_grouping_preserves_total_order() {
        // A mixed permutation of kinds and categories; flattening the steps
        // must reproduce the original order exactly.
        let kinds = [
            QuestionKind::Rating,
            QuestionKind::Text,
            QuestionKind::SingleChoice,
            QuestionKind::Textarea,
            QuestionKind::Scale,
            QuestionKind::MultiChoice,
        ];
        let categories = [
            None,
            Some(SatisfactionCategory::Course),
            Some(SatisfactionCategory::Instructor),
            Some(SatisfactionCategory::Operation),
        ];

        let questions: Vec<Question> = (0..24)
            .map(|i| {
                question(
                    i,
                    kinds[(i as usize) % kinds.len()],
                    categories[(i as usize / 3) % categories.len()],
                )
            })
            .collect();

        let steps = group_flat(&questions);
        assert_eq!(flatten(&steps), (0..24).collect::<Vec<i64>>());

        // Caps hold everywhere
        for step in &steps {
            match classify(step[0].kind) {
                Classification::Objective => assert!(step.len() <= OBJECTIVE_STEP_CAP),
                Classification::Subjective => assert!(step.len() <= SUBJECTIVE_STEP_CAP),
                Classification::Standalone => assert_eq!(step.len(), 1),
            }
        }

        // Adjacent questions with differing categories never share a step
        for step in &steps {
            for pair in step.windows(2) {
                assert_eq!(pair[0].category, pair[1].category);
            }
        }
    }

    #[test]
    fn no_category_tags_behave_as_one_uniform_category() {
        let questions: Vec<Question> = (0..7)
            .map(|i| question(i, QuestionKind::Rating, None))
            .collect();

        let steps = group_flat(&questions);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].len(), 7);
    }

    #[test]
    fn per_session_orders_by_binding_position_then_index() {
        let early = binding(0);
        let late = binding(1);

        let mut q_late = question(0, QuestionKind::Rating, None);
        q_late.session_id = Some(late.id);
        let mut q_early = question(1, QuestionKind::Rating, None);
        q_early.session_id = Some(early.id);
        let q_operation = question(2, QuestionKind::Text, Some(SatisfactionCategory::Operation));

        let steps = group_per_session(
            &[q_late.clone(), q_early.clone(), q_operation.clone()],
            &[early, late],
        );

        // One question per step; session-bound first by position, then the
        // sessionless operation question
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0][0].id, q_early.id);
        assert_eq!(steps[1][0].id, q_late.id);
        assert_eq!(steps[2][0].id, q_operation.id);
    }

    #[test]
    fn per_session_treats_unbound_session_id_as_sessionless() {
        let bound = binding(0);
        let mut q_bound = question(5, QuestionKind::Rating, None);
        q_bound.session_id = Some(bound.id);
        let mut q_dangling = question(1, QuestionKind::Rating, None);
        q_dangling.session_id = Some(Uuid::new_v4());

        let steps = group_per_session(&[q_bound.clone(), q_dangling.clone()], &[bound]);
        assert_eq!(steps[0][0].id, q_bound.id);
        assert_eq!(steps[1][0].id, q_dangling.id);
    }
}
