//! Renewal Reconciler service binary.
//!
//! Wires configuration, PostgreSQL, the Google Play adapters and the webhook
//! router, runs the notification sweeper alongside the HTTP server, and shuts
//! both down on Ctrl-C.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use renewal_reconciler::adapters::google_play::{
    GooglePlayDeveloperApiClient, GooglePlayNotificationDecoder, StaticAccessTokenSource,
};
use renewal_reconciler::adapters::http::{webhook_router, WebhookAppState};
use renewal_reconciler::adapters::postgres::{
    PostgresProcessedNotificationStore, PostgresSubscriptionLedger,
};
use renewal_reconciler::adapters::TracingAuditSink;
use renewal_reconciler::application::{NotificationSweeper, ReconcileNotificationHandler};
use renewal_reconciler::config::{AppConfig, LogFormat};
use renewal_reconciler::domain::billing::WebhookAuthenticator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        package_name = %config.provider.package_name,
        "Starting renewal reconciler"
    );

    // Database
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Ports
    let notifications = Arc::new(PostgresProcessedNotificationStore::new(pool.clone()));
    let ledger = Arc::new(PostgresSubscriptionLedger::new(pool.clone()));
    let fetcher = GooglePlayDeveloperApiClient::new(
        config.provider.api_base_url.clone(),
        config.provider.package_name.clone(),
        Arc::new(StaticAccessTokenSource::new(config.provider.access_token.clone())),
        config.provider.request_timeout(),
    )?;

    let handler = Arc::new(
        ReconcileNotificationHandler::new(
            Arc::new(GooglePlayNotificationDecoder::new(
                config.provider.package_name.clone(),
            )),
            Arc::new(fetcher),
            notifications.clone(),
            ledger,
            Arc::new(TracingAuditSink::new()),
        )
        .with_settings(
            config
                .reconciliation
                .settings(config.provider.request_timeout()),
        ),
    );

    let authenticator = WebhookAuthenticator::from_settings(
        config.webhook.token(),
        config.webhook.expected_subscription.clone(),
        config.webhook.allow_unauthenticated,
        config.server.is_development(),
    );

    // Background sweeper
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = NotificationSweeper::new(
        notifications,
        handler.clone(),
        config.reconciliation.sweeper(),
    );
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    // Router
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(webhook_router(WebhookAppState {
            authenticator: Arc::new(authenticator),
            handler,
        }))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_task.await {
        tracing::error!(error = %e, "Notification sweeper task failed");
    }
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.server.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
