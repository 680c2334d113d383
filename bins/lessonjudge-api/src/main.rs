mod auth;
mod error;
mod handlers;
mod metrics;
mod routes;

use axum::Router;
use lessonjudge_common::config::{Config, LogFormat};
use lessonjudge_grader::{Grader, Judge0Client, JudgeClientConfig, RedisLessonStore};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub grader: Grader,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install CTRL+C signal handler");
        return;
    }
    warn!("Received shutdown signal, finishing in-flight gradings...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    init_tracing(config.log_format);

    info!("lessonjudge API booting...");

    // Connect to Redis
    let client = redis::Client::open(config.redis_url.as_str())?;
    let redis_conn = ConnectionManager::new(client).await?;

    info!("Connected to Redis: {}", config.redis_url);

    let judge = Judge0Client::new(JudgeClientConfig::from(&config));
    info!(
        judge_url = %config.judge_url,
        transport = %config.judge_transport,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        max_poll_attempts = ?config.max_poll_attempts,
        call_timeout = ?config.judge_call_timeout,
        submission_deadline = ?config.submission_deadline,
        "Judge client configured"
    );

    let grader = Grader::new(Arc::new(RedisLessonStore::new(redis_conn)), Arc::new(judge))
        .with_submission_deadline(config.submission_deadline);

    let state = Arc::new(AppState { grader });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    // Start server
    let listener = TcpListener::bind(&config.bind_addr).await?;

    info!("HTTP server listening on {}", config.bind_addr);
    info!("Ready to grade submissions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API shutdown complete");
    Ok(())
}
