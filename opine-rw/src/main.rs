//! opine-rw (Respondent Wizard) - Public survey-taking service
//!
//! Serves the anonymous respondent flow for the Opine survey platform:
//! wizard pagination, answer tracking, and transactional submission.

use anyhow::Result;
use clap::Parser;
use opine_common::config::{
    self, load_default_toml_config, resolve_root_folder, RuntimeConfig,
};
use opine_common::db::init_database;
use opine_rw::{build_router, AppState};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "opine-rw", about = "Opine respondent wizard service")]
struct Args {
    /// Root data folder (overrides OPINE_ROOT_FOLDER and the config file)
    #[arg(long)]
    root_folder: Option<String>,

    /// Port for the respondent API
    #[arg(long, env = "OPINE_RW_PORT", default_value_t = 5850)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Opine Respondent Wizard (opine-rw) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "OPINE_ROOT_FOLDER");
    let toml_config = load_default_toml_config();
    let runtime = RuntimeConfig::from_toml(&toml_config);

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    let state = AppState::from_pool(pool, runtime);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("opine-rw listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
