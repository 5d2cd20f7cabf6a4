//! Application state
//!
//! Holds the shared state for the Axum application: the service context, the
//! token verifier, and the readiness probe.

use std::sync::Arc;

use async_trait::async_trait;
use relay_cache::SharedRedisPool;
use relay_common::JwtService;
use relay_db::PgPool;
use relay_service::ServiceContext;

/// Checks whether the backing stores are reachable
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn database_ready(&self) -> bool;
    async fn cache_ready(&self) -> bool;
}

/// Probe that pings the real Postgres and Redis pools
pub struct BackendProbe {
    pool: PgPool,
    redis: SharedRedisPool,
}

impl BackendProbe {
    pub fn new(pool: PgPool, redis: SharedRedisPool) -> Self {
        Self { pool, redis }
    }
}

#[async_trait]
impl ReadinessProbe for BackendProbe {
    async fn database_ready(&self) -> bool {
        self.pool.acquire().await.is_ok()
    }

    async fn cache_ready(&self) -> bool {
        self.redis.health_check().await.is_ok()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Service context containing all dependencies
    service_context: Arc<ServiceContext>,
    /// Verifies bearer tokens
    jwt_service: Arc<JwtService>,
    /// Dependency health for `/health/ready`
    readiness: Arc<dyn ReadinessProbe>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        service_context: ServiceContext,
        jwt_service: JwtService,
        readiness: Arc<dyn ReadinessProbe>,
    ) -> Self {
        Self {
            service_context: Arc::new(service_context),
            jwt_service: Arc::new(jwt_service),
            readiness,
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Get the readiness probe
    pub fn readiness(&self) -> &dyn ReadinessProbe {
        self.readiness.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &self.service_context)
            .field("jwt_service", &self.jwt_service)
            .finish_non_exhaustive()
    }
}
