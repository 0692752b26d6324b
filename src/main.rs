//! Concierge - AI persona chat backend
//!
//! Answers visitor questions on behalf of a professional, offers meeting
//! times through a scheduling service, and emails the professional when a
//! visitor leaves contact details.

mod api;
mod config;
mod leads;
mod llm;
mod notify;
mod persona;
mod runtime;
mod scheduling;
mod tools;

use api::{create_router, AppState};
use config::Config;
use leads::{LeadWatcher, PatternDetector};
use llm::{GeminiService, LlmService, LoggingService};
use notify::{AlertDispatcher, ResendNotifier};
use runtime::{ChatOrchestrator, Orchestrator, ToolExecutor};
use scheduling::Scheduler;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tools::ToolRegistry;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for in-flight alerts
const ALERT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Model
    let gemini = GeminiService::new(
        config.llm.api_key.clone(),
        &config.llm.model,
        &config.llm.base_url,
        config.llm.timeout,
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(gemini)));
    tracing::info!(model = %llm.model_id(), "LLM client initialized");

    // Alerts
    let tracker = TaskTracker::new();
    let notifier = ResendNotifier::new(&config.notify, config.http_timeout)?;
    let alerts = AlertDispatcher::new(Arc::new(notifier), tracker.clone());

    // Scheduling
    let scheduler = Scheduler::from_config(&config.scheduling, config.http_timeout)?;
    let tier = scheduler.tier();
    tracing::info!(tier = ?tier, fallback_url = %scheduler.fallback_url(), "Scheduling configured");
    let scheduler = Arc::new(scheduler);

    // Create application state
    let tools: Arc<dyn ToolExecutor> = Arc::new(ToolRegistry::new(scheduler, alerts.clone()));
    let orchestrator: ChatOrchestrator = Orchestrator::new(
        llm,
        tools,
        persona::priming_turns(&config.persona),
        config.max_tool_rounds,
    )
    .with_max_tokens(config.llm.max_output_tokens);
    let leads = LeadWatcher::new(Arc::new(PatternDetector), alerts);
    let state = AppState::new(orchestrator, leads, tier);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Concierge server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracker.close();
    if tokio::time::timeout(ALERT_DRAIN_TIMEOUT, tracker.wait())
        .await
        .is_err()
    {
        tracing::warn!(pending = tracker.len(), "Shutting down with alerts still in flight");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
