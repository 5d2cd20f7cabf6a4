//! Message history and reaction handlers

use axum::{extract::State, Json};
use relay_core::Message;
use relay_service::{AddReactionRequest, Envelope, HistoryQuery, MessagingService};

use crate::extractors::{AuthUser, ValidatedJson, ValidatedQuery};
use crate::response::ApiResult;
use crate::state::AppState;

/// Archived history for a user, group, or channel target
///
/// GET /api/v1/messages/history?target_id=..&target_type=..
pub async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> ApiResult<Json<Envelope<Vec<Message>>>> {
    let service = MessagingService::new(state.service_context());
    let messages = service
        .get_history(&auth.user_id, query.target_type, &query.target_id)
        .await?;

    Ok(Json(Envelope::ok("History retrieved", messages)))
}

/// Every archived message the caller authored or received directly
///
/// GET /api/v1/messages/conversations
pub async fn get_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Envelope<Vec<Message>>>> {
    let service = MessagingService::new(state.service_context());
    let messages = service.get_user_conversations(&auth.user_id).await?;

    Ok(Json(Envelope::ok("Conversations retrieved", messages)))
}

/// React to a staged or archived message
///
/// POST /api/v1/messages/reaction
pub async fn add_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<AddReactionRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    let service = MessagingService::new(state.service_context());
    service
        .add_reaction(req.message_id, &req.reaction, &auth.user_id)
        .await?;

    Ok(Json(Envelope::notice("Reaction added")))
}
