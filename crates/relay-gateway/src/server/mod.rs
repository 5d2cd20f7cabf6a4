//! Gateway server setup
//!
//! Provides the WebSocket route, dependency wiring, and the server lifecycle.

mod background;
mod handler;
mod state;

pub use background::BackgroundTasks;
pub use handler::{ws_handler, ConnectParams};
pub use state::{GatewayState, DEFAULT_OUTBOUND_BUFFER};

use axum::{extract::State, routing::get, Json, Router};
use relay_cache::{
    create_shared_pool, enable_expiry_notifications, ExpiredKey, KeyspaceSubscriber,
    RedisPoolConfig, RedisStagingStore, SharedRedisPool, StagingSettings, SubscriberConfig,
};
use relay_common::{AppConfig, AppError, JwtService};
use relay_db::{PgMembershipRepository, PgMessageRepository};
use relay_service::{HealthResponse, ServiceContext};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Broadcast capacity between the keyspace subscriber and the listener
const EXPIRY_EVENT_BUFFER: usize = 1024;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/messages/ws", get(ws_handler))
        .route("/health", get(health_check))
}

/// Liveness plus the number of connected users
#[derive(Debug, Serialize)]
struct GatewayHealth {
    #[serde(flatten)]
    health: HealthResponse,
    connections: usize,
}

async fn health_check(State(state): State<GatewayState>) -> Json<GatewayHealth> {
    Json(GatewayHealth {
        health: HealthResponse::healthy(),
        connections: state.registry().connection_count(),
    })
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Connect to Postgres and Redis, and build the service context
pub async fn create_service_context(
    config: &AppConfig,
) -> Result<(ServiceContext, SharedRedisPool), AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let pool = relay_db::create_pool(&relay_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    let redis = create_shared_pool(RedisPoolConfig::from(&config.redis))
        .map_err(|e| AppError::Cache(e.to_string()))?;

    let staging = RedisStagingStore::new(redis.clone(), StagingSettings::from(&config.messaging));

    let context = ServiceContext::builder()
        .staging(Arc::new(staging))
        .archive(Arc::new(PgMessageRepository::new(pool.clone())))
        .membership(Arc::new(PgMembershipRepository::new(pool)))
        .messaging_config(&config.messaging)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok((context, redis))
}

/// Subscribe to key expiry events, or return `None` to run sweep-only
async fn subscribe_expiry_events(
    config: &AppConfig,
    redis: &SharedRedisPool,
    shutdown: CancellationToken,
) -> Option<broadcast::Receiver<ExpiredKey>> {
    let messaging = &config.messaging;
    if !messaging.expiry_listener_enabled {
        tracing::info!("Expiry listener disabled by configuration");
        return None;
    }

    if messaging.configure_keyspace_events {
        if let Err(e) = enable_expiry_notifications(redis).await {
            tracing::warn!(error = %e, "Could not enable key expiry notifications");
        }
    }

    let subscriber_config = SubscriberConfig {
        redis_url: config.redis.url.clone(),
        broadcast_buffer: EXPIRY_EVENT_BUFFER,
        reconnect_delay: messaging.listener_reconnect_delay(),
    };

    match KeyspaceSubscriber::connect(subscriber_config, shutdown).await {
        Ok(subscriber) => Some(subscriber.receiver()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to subscribe to key expiry events");
            None
        }
    }
}

/// Initialize all dependencies, create `GatewayState`, and start the workers
pub async fn create_gateway_state(
    config: &AppConfig,
    shutdown: CancellationToken,
) -> Result<(GatewayState, BackgroundTasks), AppError> {
    let (context, redis) = create_service_context(config).await?;
    let context = Arc::new(context);

    let expiry_events = subscribe_expiry_events(config, &redis, shutdown.child_token()).await;
    let tasks = BackgroundTasks::start(
        context.clone(),
        config.messaging.sweep_interval(),
        expiry_events,
        shutdown,
    );

    let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry);
    let state = GatewayState::new(context, jwt, config.messaging.outbound_buffer);

    Ok((state, tasks))
}

/// Run the gateway server until `shutdown` resolves
pub async fn run_server(
    app: Router,
    listener: TcpListener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway listening on ws://{}/messages/ws", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Run the complete gateway server with configuration
///
/// Stops on Ctrl-C or SIGTERM: first the HTTP server drains, then the
/// archival workers are cancelled.
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    let (state, tasks) = create_gateway_state(&config, CancellationToken::new()).await?;
    let app = create_app(state);

    let result = run_server(app, listener, shutdown_signal()).await;
    tasks.shutdown().await;
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        () = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
