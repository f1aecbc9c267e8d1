use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use invites_api::{OutboundMessage, PublishError, VoteMessage, VoteRequest};

use super::IntakeState;

pub const MSG_BAD_BODY: &str = "Error:parsing the request, please validate the request body";
pub const MSG_MISSING_DATA: &str = "Error:parsing the request, missing the required data";
pub const MSG_PUBLISH_FAILED: &str = "Error: publishing message";

// ═══════════════════════════════════════════════════════════════
//  ANY /  {"name": "...", "vote": "..."}
// ═══════════════════════════════════════════════════════════════

/// Принять голос и переопубликовать его в topic.
///
/// Ровно одна попытка публикации на валидный запрос, без ретраев.
pub(crate) async fn accept_invites(
    State(state): State<IntakeState>,
    body: Bytes,
) -> Response {
    let request = match VoteRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "rejected vote request");
            return (StatusCode::BAD_REQUEST, MSG_BAD_BODY).into_response();
        }
    };

    let vote = match VoteMessage::try_from(request) {
        Ok(vote) => vote,
        Err(e) => {
            tracing::warn!(error = %e, "rejected vote request");
            return (StatusCode::BAD_REQUEST, MSG_MISSING_DATA).into_response();
        }
    };

    match publish_vote(&state, &vote).await {
        Ok(message_id) => {
            tracing::info!(topic = %state.topic, message_id = %message_id, "vote published");
            (
                StatusCode::OK,
                format!("Hello, {}!, we have received your vote.", vote.name()),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(topic = %state.topic, error = ?e, "publish failed");
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_PUBLISH_FAILED).into_response()
        }
    }
}

/// Сериализовать голос и дождаться ack. Shutdown прерывает ожидание.
async fn publish_vote(state: &IntakeState, vote: &VoteMessage) -> Result<String, PublishError> {
    let payload = vote
        .to_payload()
        .map_err(|e| PublishError::format_err(e.to_string()))?;

    tokio::select! {
        res = state.publisher.publish(&state.topic, OutboundMessage::new(payload)) => res,
        _ = state.shutdown.cancelled() => Err(PublishError::cancelled("server shutting down")),
    }
}
