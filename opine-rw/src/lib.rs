//! opine-rw library - Respondent Wizard service
//!
//! Serves the public survey-taking flow: anonymous respondents open a
//! survey through its link, step through the generated wizard, and submit
//! their answers once.

use std::sync::Arc;

use axum::Router;
use opine_common::config::RuntimeConfig;
use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod registry;
pub mod util;
pub mod wizard;

use registry::WizardRegistry;
use wizard::{ReplayGuard, ResponseWriter, SessionManager, SubmissionPipeline, SurveyLoader};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<dyn SurveyLoader>,
    pub sessions: Arc<dyn SessionManager>,
    pub registry: WizardRegistry,
    pub guard: ReplayGuard,
    pub pipeline: Arc<SubmissionPipeline>,
}

impl AppState {
    /// Wire explicit collaborators; tests substitute mocks here
    pub fn new(
        loader: Arc<dyn SurveyLoader>,
        sessions: Arc<dyn SessionManager>,
        writer: Arc<dyn ResponseWriter>,
        runtime: RuntimeConfig,
    ) -> Self {
        let guard = ReplayGuard::new();
        let pipeline = Arc::new(SubmissionPipeline::new(
            writer,
            sessions.clone(),
            guard.clone(),
            runtime.submit_retry_delay_ms,
        ));

        Self {
            loader,
            sessions,
            registry: WizardRegistry::new(),
            guard,
            pipeline,
        }
    }

    /// Production wiring over one database pool
    pub fn from_pool(pool: SqlitePool, runtime: RuntimeConfig) -> Self {
        Self::new(
            Arc::new(db::SqlSurveyLoader::new(pool.clone())),
            Arc::new(db::SqlSessionManager::new(pool.clone())),
            Arc::new(db::SqlResponseWriter::new(pool)),
            runtime,
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/surveys/:survey_id/wizard", post(api::open_wizard))
        .route("/api/wizard/:wizard_id", get(api::wizard_view))
        .route("/api/wizard/:wizard_id/start", post(api::start_wizard))
        .route(
            "/api/wizard/:wizard_id/answers/:question_id",
            put(api::put_answer),
        )
        .route("/api/wizard/:wizard_id/next", post(api::next_step))
        .route("/api/wizard/:wizard_id/previous", post(api::previous_step))
        .route("/api/wizard/:wizard_id/submit", post(api::submit_wizard))
        .merge(api::health_routes())
        // The wizard is reached from a public link; permissive CORS keeps
        // embedded/linked clients working
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
