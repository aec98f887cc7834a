//! Anonymous participation records and one-time access codes

use async_trait::async_trait;
use opine_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::wizard::SessionManager;

#[derive(Clone)]
pub struct SqlSessionManager {
    pool: SqlitePool,
}

impl SqlSessionManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionManager for SqlSessionManager {
    async fn is_completed(&self, survey_id: Uuid, respondent: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM participations WHERE survey_guid = ? AND respondent = ?",
        )
        .bind(survey_id.to_string())
        .bind(respondent)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::from_db)?;

        Ok(count > 0)
    }

    async fn mark_completed(&self, survey_id: Uuid, respondent: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO participations (survey_guid, respondent) VALUES (?, ?)",
        )
        .bind(survey_id.to_string())
        .bind(respondent)
        .execute(&self.pool)
        .await
        .map_err(Error::from_db)?;

        debug!(survey_id = %survey_id, "Recorded participation");
        Ok(())
    }

    async fn validate_token(&self, survey_id: Uuid, code: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM access_codes
            WHERE code = ? AND survey_guid = ? AND used_at IS NULL
            "#,
        )
        .bind(code)
        .bind(survey_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::from_db)?;

        Ok(count > 0)
    }

    async fn consume_token(&self, survey_id: Uuid, code: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE access_codes SET used_at = CURRENT_TIMESTAMP
            WHERE code = ? AND survey_guid = ? AND used_at IS NULL
            "#,
        )
        .bind(code)
        .bind(survey_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Error::from_db)?;

        debug!(survey_id = %survey_id, "Consumed access code");
        Ok(())
    }
}
