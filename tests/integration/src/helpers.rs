//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests,
//! and driving WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relay_api::state::ReadinessProbe;
use relay_common::{AppConfig, JwtService};
use relay_gateway::GatewayState;
use relay_service::testing::{StaticMembership, TestBackends};
use relay_service::Envelope;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{TEST_ARCHIVE_AFTER, TEST_JWT_SECRET};

/// Client side of a gateway socket
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for a frame before failing the test
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Readiness probe for in-memory stores, which are always up
struct InMemoryProbe;

#[async_trait]
impl ReadinessProbe for InMemoryProbe {
    async fn database_ready(&self) -> bool {
        true
    }

    async fn cache_ready(&self) -> bool {
        true
    }
}

async fn serve(app: axum::Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((addr, handle))
}

/// Mint an access token for `user_id`
pub fn token_for(user_id: &str) -> String {
    JwtService::new(TEST_JWT_SECRET, 900)
        .issue_access_token(user_id)
        .expect("failed to issue test token")
}

// ============================================================================
// Gateway
// ============================================================================

/// Gateway server over in-memory stores
pub struct TestGateway {
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub backends: TestBackends,
    _handle: JoinHandle<()>,
}

impl TestGateway {
    /// Start a gateway with no group or channel members
    pub async fn start() -> Result<Self> {
        Self::start_with_membership(StaticMembership::new()).await
    }

    /// Start a gateway with a fixed membership table
    pub async fn start_with_membership(membership: StaticMembership) -> Result<Self> {
        let backends = TestBackends::with_membership(membership);
        let state = GatewayState::new(
            Arc::new(backends.context(TEST_ARCHIVE_AFTER)),
            JwtService::new(TEST_JWT_SECRET, 900),
            relay_gateway::server::DEFAULT_OUTBOUND_BUFFER,
        );

        let (addr, handle) = serve(relay_gateway::create_app(state.clone())).await?;

        Ok(Self {
            addr,
            state,
            backends,
            _handle: handle,
        })
    }

    /// Socket URL with the token in the query string
    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/messages/ws?token={token}", self.addr)
    }

    /// Connect as `user_id` and wait until the registry holds the new socket
    pub async fn connect(&self, user_id: &str) -> Result<WsClient> {
        let previous = self.state.registry().lookup(user_id).map(|c| c.id());

        let (ws, _) = tokio_tungstenite::connect_async(self.ws_url(&token_for(user_id))).await?;
        self.wait_for(|state| {
            state
                .registry()
                .lookup(user_id)
                .is_some_and(|c| Some(c.id()) != previous)
        })
        .await
        .with_context(|| format!("{user_id} never registered"))?;

        Ok(ws)
    }

    /// Poll until `condition` holds or `FRAME_TIMEOUT` passes
    pub async fn wait_for(&self, condition: impl Fn(&GatewayState) -> bool) -> Result<()> {
        let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
        while !condition(&self.state) {
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("condition not met within {FRAME_TIMEOUT:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }
}

/// Send a JSON frame over a client socket
pub async fn send_frame<T: Serialize>(ws: &mut WsClient, frame: &T) -> Result<()> {
    let text = serde_json::to_string(frame)?;
    ws.send(tungstenite::Message::Text(text)).await?;
    Ok(())
}

/// Read the next envelope, skipping control frames
pub async fn next_envelope<T: DeserializeOwned>(ws: &mut WsClient) -> Result<Envelope<T>> {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .context("timed out waiting for a frame")?
            .context("socket closed")??;

        match frame {
            tungstenite::Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            tungstenite::Message::Close(_) => anyhow::bail!("socket closed by server"),
            _ => {}
        }
    }
}

/// Assert nothing arrives on the socket for `wait`
pub async fn expect_silence(ws: &mut WsClient, wait: Duration) -> Result<()> {
    match tokio::time::timeout(wait, ws.next()).await {
        Err(_) => Ok(()),
        Ok(frame) => anyhow::bail!("unexpected frame: {frame:?}"),
    }
}

// ============================================================================
// REST API
// ============================================================================

/// API server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub backends: TestBackends,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start an API server over in-memory stores
    pub async fn start() -> Result<Self> {
        Self::start_with_backends(TestBackends::new()).await
    }

    /// Start an API server sharing `backends` with other servers in the test
    pub async fn start_with_backends(backends: TestBackends) -> Result<Self> {
        let state = relay_api::AppState::new(
            backends.context(TEST_ARCHIVE_AFTER),
            JwtService::new(TEST_JWT_SECRET, 900),
            Arc::new(InMemoryProbe),
        );
        Self::spawn(relay_api::create_app(state), backends).await
    }

    /// Start an API server against the Postgres and Redis in the environment
    pub async fn start_live(config: &AppConfig) -> Result<Self> {
        let state = relay_api::server::create_app_state(config).await?;
        Self::spawn(relay_api::create_app(state), TestBackends::new()).await
    }

    async fn spawn(app: axum::Router, backends: TestBackends) -> Result<Self> {
        let (addr, handle) = serve(app).await?;
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            backends,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(token).send().await?)
    }

    /// Make a POST request with auth token
    pub async fn post_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }
}

/// Load configuration for live-backend tests
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Helper to check if a live test environment is available
pub fn check_test_env() -> bool {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("Skipping test: DATABASE_URL not set");
        return false;
    }

    if std::env::var("REDIS_URL").is_err() {
        eprintln!("Skipping test: REDIS_URL not set");
        return false;
    }

    true
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status only
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
