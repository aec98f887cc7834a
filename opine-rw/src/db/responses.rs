//! Response persistence
//!
//! A response record is created first; its answers are then written in one
//! transaction so the batch lands atomically or not at all. Transient
//! failures surface as `Error::Timeout` for the submission pipeline's
//! single retry.

use async_trait::async_trait;
use chrono::Utc;
use opine_common::db::AnswerRow;
use opine_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::wizard::ResponseWriter;

#[derive(Clone)]
pub struct SqlResponseWriter {
    pool: SqlitePool,
}

impl SqlResponseWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResponseWriter for SqlResponseWriter {
    async fn create_response(&self, survey_id: Uuid) -> Result<Uuid> {
        let response_id = Uuid::new_v4();

        sqlx::query("INSERT INTO responses (guid, survey_guid, submitted_at) VALUES (?, ?, ?)")
            .bind(response_id.to_string())
            .bind(survey_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;

        debug!(survey_id = %survey_id, response_id = %response_id, "Created response record");
        Ok(response_id)
    }

    async fn bulk_write_answers(&self, response_id: Uuid, rows: Vec<AnswerRow>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::from_db)?;

        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO response_answers (response_guid, question_guid, question_text, value)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(row.response_id.to_string())
            .bind(row.question_id.to_string())
            .bind(&row.question_text)
            .bind(&row.value)
            .execute(&mut *tx)
            .await
            .map_err(Error::from_db)?;
        }

        tx.commit().await.map_err(Error::from_db)?;

        debug!(response_id = %response_id, answers = rows.len(), "Wrote answer batch");
        Ok(())
    }
}
