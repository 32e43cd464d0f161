mod analysis;
mod config;
mod db;
mod errors;
mod extract;
mod llm;
mod routes;
mod state;
mod storage;
mod tasks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::ObjectStore;
use crate::tasks::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_env_filter(&config.rust_log)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Prospect API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let store = ObjectStore::new(s3, config.s3_bucket.clone(), config.s3_endpoint.clone());
    info!("Object store initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm_client = LlmClient::new(config.yandex_api_key.clone(), &config.yandex_folder_id);
    info!("LLM client initialized (model: {})", llm_client.model_uri());
    let llm: Arc<dyn llm::CompletionBackend> = Arc::new(llm_client);

    // Start the background scheduler
    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(
        db.clone(),
        store.clone(),
        llm.clone(),
        Duration::from_secs(config.poll_interval_secs),
    );
    let scheduler_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    // Build app state
    let state = AppState { db, store, llm };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    cancel.cancel();
    scheduler_handle.await?;

    Ok(())
}

/// Fallback filter when `RUST_LOG` is unset. Tracing targets use the
/// crate name with underscores, not the hyphenated package name.
fn default_env_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME")))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "prospect-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
