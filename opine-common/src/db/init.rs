//! Database initialization
//!
//! Creates the sqlite database on first run and brings the schema up
//! idempotently. Every `create_*_table` function is safe to call repeatedly.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Connect to an in-memory database with the full schema; used by tests
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_pragmas(&pool).await?;
    create_all_tables(&pool).await?;

    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers while a submission batch is writing
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_surveys_table(pool).await?;
    create_sections_table(pool).await?;
    create_courses_table(pool).await?;
    create_instructors_table(pool).await?;
    create_session_bindings_table(pool).await?;
    create_questions_table(pool).await?;
    create_responses_table(pool).await?;
    create_response_answers_table(pool).await?;
    create_participations_table(pool).await?;
    create_access_codes_table(pool).await?;
    Ok(())
}

async fn create_surveys_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS surveys (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            starts_at TIMESTAMP,
            ends_at TIMESTAMP,
            template_guid TEXT,
            default_instructor_guid TEXT,
            grouping_mode TEXT NOT NULL DEFAULT 'flat',
            access_code_required INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sections (
            guid TEXT PRIMARY KEY,
            survey_guid TEXT NOT NULL REFERENCES surveys(guid) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT,
            order_index INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_instructors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instructors (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_session_bindings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_bindings (
            guid TEXT PRIMARY KEY,
            survey_guid TEXT NOT NULL REFERENCES surveys(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            course_guid TEXT NOT NULL REFERENCES courses(guid),
            instructor_guid TEXT NOT NULL REFERENCES instructors(guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            guid TEXT PRIMARY KEY,
            survey_guid TEXT NOT NULL REFERENCES surveys(guid) ON DELETE CASCADE,
            question_text TEXT NOT NULL,
            kind TEXT NOT NULL,
            is_required INTEGER NOT NULL DEFAULT 0,
            order_index INTEGER NOT NULL,
            section_guid TEXT REFERENCES sections(guid),
            session_guid TEXT REFERENCES session_bindings(guid),
            category TEXT,
            options TEXT,
            UNIQUE(survey_guid, order_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_responses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS responses (
            guid TEXT PRIMARY KEY,
            survey_guid TEXT NOT NULL REFERENCES surveys(guid),
            submitted_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_response_answers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS response_answers (
            response_guid TEXT NOT NULL REFERENCES responses(guid) ON DELETE CASCADE,
            question_guid TEXT NOT NULL REFERENCES questions(guid),
            question_text TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (response_guid, question_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_participations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participations (
            survey_guid TEXT NOT NULL REFERENCES surveys(guid),
            respondent TEXT NOT NULL,
            completed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (survey_guid, respondent)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_access_codes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS access_codes (
            code TEXT PRIMARY KEY,
            survey_guid TEXT NOT NULL REFERENCES surveys(guid) ON DELETE CASCADE,
            used_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
