//! Inbound frame handling
//!
//! Turns one client frame into a staged message plus its deliveries, or into an
//! error envelope for the author.

mod error;

pub use error::{HandlerError, HandlerResult};

use crate::broadcast::DeliveryReport;
use crate::connection::Connection;
use crate::protocol::decode_send_request;
use crate::server::GatewayState;
use relay_service::MessagingService;

/// Stage a message sent over `connection` and fan it out
///
/// Nothing is delivered unless staging succeeded.
pub async fn handle_send_message(
    state: &GatewayState,
    connection: &Connection,
    text: &str,
) -> HandlerResult<DeliveryReport> {
    let request = decode_send_request(text)?;

    let message = MessagingService::new(state.service_context())
        .send_message(connection.user_id(), request)
        .await?;

    Ok(state.dispatcher().dispatch(&message, connection).await)
}

/// Report a failed frame back to its author
pub async fn reply_with_error(connection: &Connection, error: &HandlerError) {
    if error.is_client_error() {
        tracing::debug!(user_id = %connection.user_id(), error = %error, "Rejected frame");
    } else {
        tracing::warn!(user_id = %connection.user_id(), error = %error, "Failed to handle frame");
    }

    if connection.send(error.to_envelope()).await.is_err() {
        tracing::debug!(user_id = %connection.user_id(), "Connection closed before error reply");
    }
}
