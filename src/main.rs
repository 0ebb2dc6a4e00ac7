use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ordergate::activation::{NoopActivator, SubscriptionActivator, WebhookActivator};
use ordergate::audit::AuditLogger;
use ordergate::config::Config;
use ordergate::crypto::sha256_hex;
use ordergate::db::{create_pool, init_audit_db, init_db, queries, AppState};
use ordergate::handlers;
use ordergate::models::CreateOrder;
use ordergate::rate_limit::UpdateRateLimiter;

#[derive(Parser, Debug)]
#[command(name = "ordergate")]
#[command(about = "Payment order lifecycle service with idempotent webhook processing")]
struct Cli {
    /// Seed the database with a dev order (dev mode only)
    #[arg(long)]
    seed: bool,
}

/// Seeds a PENDING dev order so the update endpoint can be exercised
/// immediately. Only runs in dev mode and only once.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    match queries::get_order_by_external_id(&conn, "dev-order-1") {
        Ok(Some(order)) => {
            tracing::info!("Dev order already exists: {}", order.id);
            return;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Failed to check for existing dev order: {}", e);
            return;
        }
    }

    let order = queries::create_order(
        &conn,
        &CreateOrder {
            external_order_id: "dev-order-1".to_string(),
            user_id: "dev-user".to_string(),
            subscription_id: Some("dev-sub".to_string()),
            amount_cents: 4900,
            currency: "RON".to_string(),
        },
    )
    .expect("Failed to create dev order");

    tracing::info!("============================================");
    tracing::info!("DEV ORDER SEEDED");
    tracing::info!("Order ID: {}", order.id);
    tracing::info!("External Order ID: {}", order.external_order_id);
    tracing::info!("============================================");
}

/// Spawns the background maintenance task: prunes expired throttle
/// windows and retries parked audit records. Runs every 60 seconds.
fn spawn_maintenance_task(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(60);

        loop {
            tokio::time::sleep(interval).await;

            state.throttle.cleanup();

            let pending = state.audit.pending_dead_letters();
            if pending > 0 {
                tracing::debug!("Retrying {} parked audit records", pending);
                state.audit.drain_dead_letters();
            }
        }
    });

    tracing::info!("Background maintenance task started (runs every 60 seconds)");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ordergate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let audit_pool =
        create_pool(&config.audit_database_path).expect("Failed to create audit database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = audit_pool.get().expect("Failed to get audit connection");
        init_audit_db(&conn).expect("Failed to initialize audit database");

        // Purge old audit records on startup (0 = never purge)
        if config.audit_retention_days > 0 {
            match queries::purge_old_audit_events(&conn, config.audit_retention_days) {
                Ok(count) if count > 0 => {
                    tracing::info!(
                        "Purged {} audit records older than {} days",
                        count,
                        config.audit_retention_days
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to purge old audit records: {}", e);
                }
            }
        }
    }

    let webhook_key_hashes: HashSet<String> =
        config.webhook_keys.iter().map(|k| sha256_hex(k)).collect();
    if webhook_key_hashes.is_empty() {
        tracing::warn!("No WEBHOOK_KEYS configured; all update deliveries will be rejected");
    }

    let activator: Arc<dyn SubscriptionActivator> = match config.activation_webhook_url.clone() {
        Some(url) => {
            tracing::info!("Activation webhook configured: {}", url);
            Arc::new(WebhookActivator::new(reqwest::Client::new(), url))
        }
        None => Arc::new(NoopActivator),
    };

    let state = AppState {
        db: db_pool,
        audit: Arc::new(AuditLogger::new(audit_pool, config.audit_enabled)),
        throttle: Arc::new(UpdateRateLimiter::new(
            config.throttle_max_updates,
            config.throttle_window_secs,
        )),
        activator,
        webhook_key_hashes: Arc::new(webhook_key_hashes),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set ORDERGATE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    spawn_maintenance_task(state.clone());

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Ordergate server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
