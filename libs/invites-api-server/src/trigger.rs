use axum::body::Bytes;
use axum::http::StatusCode;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use invites_api::{InboundDelivery, PubSubMessage, TopicSubscription};

/// Что подписчик увидел в сообщении.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Empty,
    Received(String),
}

/// Залогировать сообщение из topic'а. Никогда не падает.
pub fn register_invite(message: &PubSubMessage) -> Delivery {
    let text = String::from_utf8_lossy(&message.data);
    let message_id = message.message_id.as_deref().unwrap_or("-");

    if text.is_empty() {
        tracing::warn!(message_id, "empty message: no data was received");
    }
    tracing::info!(message_id, "received invite from topic: {text}");

    if text.is_empty() {
        Delivery::Empty
    } else {
        Delivery::Received(text.into_owned())
    }
}

// ═══════════════════════════════════════════════════════════════
//  POST /  (push subscription)
// ═══════════════════════════════════════════════════════════════

/// Push endpoint. Always 204: no nack path back to the broker.
pub(crate) async fn handle_push(body: Bytes) -> StatusCode {
    let message = match InboundDelivery::from_slice(&body) {
        Ok(delivery) => {
            if let Some(subscription) = delivery.subscription() {
                tracing::debug!(subscription, "push delivery");
            }
            delivery.into_message()
        }
        Err(e) => {
            tracing::warn!(error = %e, "undecodable delivery, treating as empty");
            PubSubMessage::default()
        }
    };

    register_invite(&message);
    StatusCode::NO_CONTENT
}

/// Pull-цикл для in-process подписки: каждое сообщение → register_invite.
pub fn spawn_subscription(
    mut subscription: Box<dyn TopicSubscription>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                message = subscription.recv() => match message {
                    Some(message) => {
                        register_invite(&message);
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("subscription loop stopped");
    })
}
