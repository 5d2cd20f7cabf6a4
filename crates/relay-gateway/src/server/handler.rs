//! WebSocket handler
//!
//! Authenticates the upgrade request, registers the socket, and runs its
//! read loop until the client goes away.

use crate::connection::Connection;
use crate::handlers::{handle_send_message, reply_with_error, HandlerError};
use crate::protocol::{encode_envelope, FrameError};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use relay_common::AppError;
use relay_service::Envelope;
use serde::Deserialize;
use tokio::sync::mpsc;

/// Query parameters of the upgrade request
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// The token is checked before upgrading; a bad token gets a plain 401.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = match authenticate(&state, params.token.as_deref()) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected WebSocket upgrade");
            return unauthorized(&e);
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, socket, user_id))
}

fn authenticate(state: &GatewayState, token: Option<&str>) -> Result<String, AppError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingAuth)?;
    let claims = state.jwt_service().validate_access_token(token)?;
    Ok(claims.user_id()?.to_string())
}

fn unauthorized(error: &AppError) -> Response {
    let body = Envelope::<()>::error(401, "Unauthorized", error.to_string());
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Handle an upgraded, authenticated WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, user_id: String) {
    let (tx, mut rx) = mpsc::channel::<Envelope>(state.outbound_buffer());
    let connection = Connection::new(user_id, tx);
    state.registry().register(connection.clone());

    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = %connection.id(),
        "WebSocket connection established"
    );

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Writer: drains the outbound queue until every sender is gone
    let connection_id = connection.id();
    let mut send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let json = match encode_envelope(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Failed to encode envelope");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(json)).await.is_err() {
                tracing::debug!(connection_id = %connection_id, "Socket write failed");
                break;
            }
        }

        let _ = ws_sink.close().await;
    });

    // Reader: frames are handled one at a time, preserving receipt order
    let recv_loop = async {
        while let Some(frame) = ws_stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Err(e) = handle_send_message(&state, &connection, &text).await {
                        reply_with_error(&connection, &e).await;
                    }
                }
                Ok(Message::Binary(_)) => {
                    reply_with_error(&connection, &HandlerError::from(FrameError::Binary)).await;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(user_id = %connection.user_id(), "Client closed connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(user_id = %connection.user_id(), error = %e, "WebSocket read error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        () = recv_loop => {}
        _ = &mut send_task => {
            tracing::debug!(user_id = %connection.user_id(), "Send task ended");
        }
    }

    state
        .registry()
        .unregister_connection(connection.user_id(), connection.id());

    tracing::info!(
        user_id = %connection.user_id(),
        connection_id = %connection.id(),
        "WebSocket connection closed"
    );
    // Dropping the last sender lets the writer flush and close the socket
}
