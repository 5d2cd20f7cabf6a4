//! Gateway state
//!
//! Application state for the gateway server.

use crate::broadcast::FanOutDispatcher;
use crate::connection::ConnectionRegistry;
use relay_common::JwtService;
use relay_service::ServiceContext;
use std::sync::Arc;

/// Default capacity of each connection's outbound queue
pub const DEFAULT_OUTBOUND_BUFFER: usize = 100;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server. The registry is
/// created here and lives exactly as long as the server does.
#[derive(Clone)]
pub struct GatewayState {
    /// Service context with the staging store, archive and membership resolver
    service_context: Arc<ServiceContext>,
    /// Live connections by user
    registry: Arc<ConnectionRegistry>,
    /// Fan-out over the registry
    dispatcher: Arc<FanOutDispatcher>,
    /// Verifies connection tokens
    jwt_service: Arc<JwtService>,
    /// Per-connection outbound queue capacity
    outbound_buffer: usize,
}

impl GatewayState {
    /// Create a new gateway state with an empty connection registry
    pub fn new(
        service_context: Arc<ServiceContext>,
        jwt_service: JwtService,
        outbound_buffer: usize,
    ) -> Self {
        let registry = ConnectionRegistry::new_shared();
        let dispatcher = Arc::new(FanOutDispatcher::new(
            registry.clone(),
            service_context.membership_handle(),
        ));

        Self {
            service_context,
            registry,
            dispatcher,
            jwt_service: Arc::new(jwt_service),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Shared handle to the service context
    pub fn service_context_handle(&self) -> Arc<ServiceContext> {
        self.service_context.clone()
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the fan-out dispatcher
    pub fn dispatcher(&self) -> &FanOutDispatcher {
        &self.dispatcher
    }

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Outbound queue capacity for new connections
    pub fn outbound_buffer(&self) -> usize {
        self.outbound_buffer
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", &self.registry)
            .field("outbound_buffer", &self.outbound_buffer)
            .finish_non_exhaustive()
    }
}
