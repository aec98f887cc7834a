//! Database models for the survey domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Survey lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    Draft,
    Active,
    Public,
    Completed,
}

impl SurveyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurveyStatus::Draft => "draft",
            SurveyStatus::Active => "active",
            SurveyStatus::Public => "public",
            SurveyStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SurveyStatus::Draft),
            "active" => Some(SurveyStatus::Active),
            "public" => Some(SurveyStatus::Public),
            "completed" => Some(SurveyStatus::Completed),
            _ => None,
        }
    }
}

/// How the wizard paginates a survey's questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Category/type buffered pagination (dense pages)
    Flat,
    /// One question per step, ordered by session binding position
    PerSession,
}

impl GroupingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMode::Flat => "flat",
            GroupingMode::PerSession => "per_session",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(GroupingMode::Flat),
            "per_session" => Some(GroupingMode::PerSession),
            _ => None,
        }
    }
}

/// A survey as stored; read-only to the respondent engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: SurveyStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub template_id: Option<Uuid>,
    pub default_instructor_id: Option<Uuid>,
    pub grouping: GroupingMode,
    pub access_code_required: bool,
}

impl Survey {
    /// A survey is open iff its status admits respondents and `now` falls
    /// within the activation window. A missing bound is unbounded on that side.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let status_ok = matches!(self.status, SurveyStatus::Active | SurveyStatus::Public);
        let started = self.starts_at.map(|s| now >= s).unwrap_or(true);
        let not_ended = self.ends_at.map(|e| now <= e).unwrap_or(true);
        status_ok && started && not_ended
    }

    /// Whether the activation window has not yet opened
    pub fn not_yet_open(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.map(|s| now < s).unwrap_or(false)
    }
}

/// Question answer format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    Textarea,
    SingleChoice,
    MultiChoice,
    Rating,
    Scale,
    /// Unrecognized kind from a newer authoring schema; rendered standalone
    #[serde(other)]
    Unknown,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
            QuestionKind::Textarea => "textarea",
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::Rating => "rating",
            QuestionKind::Scale => "scale",
            QuestionKind::Unknown => "unknown",
        }
    }

    /// Unknown kinds are preserved (not rejected) so that respondent flows
    /// keep working against a database written by a newer authoring UI.
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => QuestionKind::Text,
            "textarea" => QuestionKind::Textarea,
            "single_choice" => QuestionKind::SingleChoice,
            "multi_choice" => QuestionKind::MultiChoice,
            "rating" => QuestionKind::Rating,
            "scale" => QuestionKind::Scale,
            _ => QuestionKind::Unknown,
        }
    }
}

/// Which subject a question evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SatisfactionCategory {
    Course,
    Instructor,
    Operation,
}

impl SatisfactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SatisfactionCategory::Course => "course",
            SatisfactionCategory::Instructor => "instructor",
            SatisfactionCategory::Operation => "operation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "course" => Some(SatisfactionCategory::Course),
            "instructor" => Some(SatisfactionCategory::Instructor),
            "operation" => Some(SatisfactionCategory::Operation),
            _ => None,
        }
    }
}

/// Choice list or scale bounds, stored as a JSON column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionOptions {
    /// Choices for single/multi choice questions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    /// Scale lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,

    /// Scale upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub text: String,
    pub kind: QuestionKind,
    pub is_required: bool,
    pub order_index: i64,
    pub section_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub category: Option<SatisfactionCategory>,
    pub options: QuestionOptions,
}

/// Descriptive metadata attached to questions; used for step titles only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub order_index: i64,
}

/// "This block of questions evaluates this instructor for this course."
///
/// Questions attach to a binding via `Question::session_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBinding {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub position: i64,
    pub course_id: Uuid,
    pub course_name: String,
    pub instructor_id: Uuid,
    pub instructor_name: String,
}

/// Minimal instructor reference shown on wizard steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorRef {
    pub id: Uuid,
    pub name: String,
}

/// One successful submission; immutable once its answer batch is written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// One persisted answer row under a response record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    pub response_id: Uuid,
    pub question_id: Uuid,
    pub question_text: String,
    pub value: String,
}

/// A respondent's in-flight answer to one question.
///
/// Serializes as either a bare string or a string array, which is also the
/// wire form the wizard API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// An answer counts as empty when it is a blank/whitespace-only string or
    /// an empty list. Empty answers are never persisted.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Multi(items) => items.is_empty(),
        }
    }

    /// Raw storage form: the string itself, or a JSON array for multi-choice
    pub fn to_storage(&self) -> String {
        match self {
            AnswerValue::Text(s) => s.clone(),
            AnswerValue::Multi(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn survey_with(status: SurveyStatus) -> Survey {
        Survey {
            id: Uuid::new_v4(),
            title: "Course feedback".to_string(),
            description: None,
            status,
            starts_at: None,
            ends_at: None,
            template_id: None,
            default_instructor_id: None,
            grouping: GroupingMode::Flat,
            access_code_required: false,
        }
    }

    #[test]
    fn open_requires_active_or_public_status() {
        let now = Utc::now();
        assert!(survey_with(SurveyStatus::Active).is_open(now));
        assert!(survey_with(SurveyStatus::Public).is_open(now));
        assert!(!survey_with(SurveyStatus::Draft).is_open(now));
        assert!(!survey_with(SurveyStatus::Completed).is_open(now));
    }

    #[test]
    fn open_respects_activation_window() {
        let now = Utc::now();
        let mut survey = survey_with(SurveyStatus::Active);

        survey.starts_at = Some(now + Duration::hours(1));
        assert!(!survey.is_open(now));
        assert!(survey.not_yet_open(now));

        survey.starts_at = Some(now - Duration::hours(2));
        survey.ends_at = Some(now - Duration::hours(1));
        assert!(!survey.is_open(now));
        assert!(!survey.not_yet_open(now));

        survey.ends_at = Some(now + Duration::hours(1));
        assert!(survey.is_open(now));
    }

    #[test]
    fn missing_bounds_are_unbounded() {
        let now = Utc::now();
        let mut survey = survey_with(SurveyStatus::Public);
        survey.starts_at = None;
        survey.ends_at = None;
        assert!(survey.is_open(now));
    }

    #[test]
    fn answer_emptiness() {
        assert!(AnswerValue::Text("   ".to_string()).is_empty());
        assert!(AnswerValue::Multi(vec![]).is_empty());
        assert!(!AnswerValue::Text("4".to_string()).is_empty());
        assert!(!AnswerValue::Multi(vec!["a".to_string()]).is_empty());
    }

    #[test]
    fn multi_answers_store_as_json_array() {
        let value = AnswerValue::Multi(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(value.to_storage(), r#"["a","b"]"#);
    }

    #[test]
    fn unknown_question_kind_is_preserved() {
        assert_eq!(QuestionKind::parse("matrix_grid"), QuestionKind::Unknown);
        assert_eq!(QuestionKind::parse("rating"), QuestionKind::Rating);
    }
}
