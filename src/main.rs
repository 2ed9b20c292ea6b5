//! Horae - focus and break time keeper bot
//!
//! A menu-driven conversation core with per-chat countdown timers, durable
//! user records in SQLite and an HTTP boundary for inbound and outbound
//! messages.

mod api;
mod config;
mod db;
mod menu;
mod notify;
mod runtime;
mod timer;
mod user;

use api::{create_router, AppState};
use clap::Parser;
use config::Config;
use db::Database;
use notify::{BroadcastNotifier, FanoutNotifier, HttpNotifier, RetryingNotifier};
use runtime::{DatabaseRepository, Dispatcher, Notifier, UserRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use timer::TimerRegistry;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user::UserStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "horae=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::parse();

    // Ensure database directory exists
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path)?;

    if let Some(bucket) = &config.wipe_bucket {
        db.wipe_bucket(bucket)?;
    }

    let repo: Arc<dyn UserRepository> = Arc::new(DatabaseRepository::new(db));
    let users = Arc::new(UserStore::hydrate(repo.as_ref()).await?);

    // Outbound delivery: SSE hub, plus the HTTP endpoint when configured
    let broadcast = BroadcastNotifier::new();
    let mut sinks: Vec<Arc<dyn Notifier>> = vec![Arc::new(broadcast.clone())];
    if let Some(url) = &config.outbound_url {
        tracing::info!(%url, attempts = config.notify_attempts, "Outbound HTTP delivery enabled");
        let http = HttpNotifier::new(url.clone())?;
        sinks.push(Arc::new(RetryingNotifier::new(http, config.notify_attempts)));
    }
    let notifier: Arc<dyn Notifier> = Arc::new(FanoutNotifier::new(sinks));

    let (timers, events) = TimerRegistry::new(config.tick());
    let dispatcher = Dispatcher::new(users, timers, repo, notifier);

    let cancel = CancellationToken::new();
    let timer_loop = tokio::spawn(
        dispatcher
            .clone()
            .run_timer_events(events, cancel.clone()),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(dispatcher, broadcast))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Horae listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    timer_loop.await?;
    Ok(())
}
