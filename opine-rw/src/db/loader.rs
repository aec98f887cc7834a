//! Survey snapshot loading
//!
//! Loads everything the wizard needs about one survey in one pass: the
//! survey row, its questions in canonical order, sections, and instructor
//! bindings. A missing survey surfaces as `Error::NotFound`; any other
//! failure is a transient load error the respondent may retry.

use async_trait::async_trait;
use opine_common::db::{
    GroupingMode, InstructorRef, Question, QuestionKind, QuestionOptions, SatisfactionCategory,
    Section, SessionBinding, Survey, SurveyStatus,
};
use opine_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::{parse_guid, parse_opt_guid, parse_opt_timestamp};
use crate::wizard::{SurveyLoader, SurveySnapshot};

#[derive(Clone)]
pub struct SqlSurveyLoader {
    pool: SqlitePool,
}

impl SqlSurveyLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_survey(&self, survey_id: Uuid) -> Result<Survey> {
        let row = sqlx::query_as::<
            _,
            (
                String,
                String,
                Option<String>,
                String,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
                String,
                i64,
            ),
        >(
            r#"
            SELECT guid, title, description, status, starts_at, ends_at,
                   template_guid, default_instructor_guid, grouping_mode,
                   access_code_required
            FROM surveys
            WHERE guid = ?
            "#,
        )
        .bind(survey_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?
        .ok_or_else(|| Error::NotFound(format!("survey {}", survey_id)))?;

        let status = SurveyStatus::parse(&row.3)
            .ok_or_else(|| Error::Internal(format!("unknown survey status: {}", row.3)))?;
        let grouping = GroupingMode::parse(&row.8)
            .ok_or_else(|| Error::Internal(format!("unknown grouping mode: {}", row.8)))?;

        Ok(Survey {
            id: parse_guid(&row.0)?,
            title: row.1,
            description: row.2,
            status,
            starts_at: parse_opt_timestamp(row.4.as_deref()),
            ends_at: parse_opt_timestamp(row.5.as_deref()),
            template_id: parse_opt_guid(row.6.as_deref()),
            default_instructor_id: parse_opt_guid(row.7.as_deref()),
            grouping,
            access_code_required: row.9 != 0,
        })
    }

    async fn load_questions(&self, survey_id: Uuid) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<
            _,
            (
                String,
                String,
                String,
                i64,
                i64,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
            ),
        >(
            r#"
            SELECT guid, question_text, kind, is_required, order_index,
                   section_guid, session_guid, category, options
            FROM questions
            WHERE survey_guid = ?
            ORDER BY order_index ASC
            "#,
        )
        .bind(survey_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from_db)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(Question {
                id: parse_guid(&row.0)?,
                survey_id,
                text: row.1,
                kind: QuestionKind::parse(&row.2),
                is_required: row.3 != 0,
                order_index: row.4,
                section_id: parse_opt_guid(row.5.as_deref()),
                session_id: parse_opt_guid(row.6.as_deref()),
                category: row.7.as_deref().and_then(SatisfactionCategory::parse),
                options: row
                    .8
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<QuestionOptions>(raw).ok())
                    .unwrap_or_default(),
            });
        }
        Ok(questions)
    }

    async fn load_sections(&self, survey_id: Uuid) -> Result<Vec<Section>> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>, i64)>(
            r#"
            SELECT guid, name, description, order_index
            FROM sections
            WHERE survey_guid = ?
            ORDER BY order_index ASC
            "#,
        )
        .bind(survey_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from_db)?;

        rows.into_iter()
            .map(|row| {
                Ok(Section {
                    id: parse_guid(&row.0)?,
                    survey_id,
                    name: row.1,
                    description: row.2,
                    order_index: row.3,
                })
            })
            .collect()
    }

    async fn load_bindings(&self, survey_id: Uuid) -> Result<Vec<SessionBinding>> {
        let rows = sqlx::query_as::<_, (String, i64, String, String, String, String)>(
            r#"
            SELECT sb.guid, sb.position, sb.course_guid, c.name,
                   sb.instructor_guid, i.name
            FROM session_bindings sb
            JOIN courses c ON c.guid = sb.course_guid
            JOIN instructors i ON i.guid = sb.instructor_guid
            WHERE sb.survey_guid = ?
            ORDER BY sb.position ASC
            "#,
        )
        .bind(survey_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from_db)?;

        rows.into_iter()
            .map(|row| {
                Ok(SessionBinding {
                    id: parse_guid(&row.0)?,
                    survey_id,
                    position: row.1,
                    course_id: parse_guid(&row.2)?,
                    course_name: row.3,
                    instructor_id: parse_guid(&row.4)?,
                    instructor_name: row.5,
                })
            })
            .collect()
    }

    async fn load_instructor_ref(&self, instructor_id: Uuid) -> Result<Option<InstructorRef>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM instructors WHERE guid = ?")
            .bind(instructor_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?;

        Ok(name.map(|name| InstructorRef {
            id: instructor_id,
            name,
        }))
    }
}

#[async_trait]
impl SurveyLoader for SqlSurveyLoader {
    async fn load(&self, survey_id: Uuid) -> Result<SurveySnapshot> {
        let survey = self.load_survey(survey_id).await?;
        let questions = self.load_questions(survey_id).await?;
        let sections = self.load_sections(survey_id).await?;
        let bindings = self.load_bindings(survey_id).await?;

        let default_instructor = match survey.default_instructor_id {
            Some(id) => self.load_instructor_ref(id).await?,
            None => None,
        };

        debug!(
            survey_id = %survey_id,
            questions = questions.len(),
            sections = sections.len(),
            bindings = bindings.len(),
            "Loaded survey snapshot"
        );

        Ok(SurveySnapshot {
            survey,
            questions,
            sections,
            bindings,
            default_instructor,
        })
    }
}
