mod intake;
mod trigger;

use std::sync::Arc;

use axum::Router;
use axum::routing::any;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use invites_api::TopicPublisher;

pub use intake::{MSG_BAD_BODY, MSG_MISSING_DATA, MSG_PUBLISH_FAILED};
pub use trigger::{register_invite, spawn_subscription, Delivery};

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("bind :{port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("axum serve: {0}")]
    Serve(#[source] std::io::Error),
}

/// Состояние intake-хэндлера: общий publisher + имя topic'а.
///
/// Клонируется на каждый запрос; publisher создаётся один раз при старте.
#[derive(Clone)]
pub struct IntakeState {
    publisher: Arc<dyn TopicPublisher>,
    topic: Arc<str>,
    shutdown: CancellationToken,
}

impl IntakeState {
    pub fn new(
        publisher: Arc<dyn TopicPublisher>,
        topic: impl Into<Arc<str>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            shutdown,
        }
    }
}

/// Router функции приёма голосов. Метод и путь не проверяются.
pub fn intake_router(state: IntakeState) -> Router {
    Router::new()
        .route("/", any(intake::accept_invites))
        .fallback(intake::accept_invites)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router push-подписчика.
pub fn trigger_router() -> Router {
    Router::new()
        .route("/", any(trigger::handle_push))
        .fallback(trigger::handle_push)
        .layer(TraceLayer::new_for_http())
}

/// Поднять HTTP сервер на `0.0.0.0:{port}` до отмены `shutdown`.
pub async fn run(
    port: u16,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| ServeError::Bind { port, source })?;

    tracing::info!(port, "http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ServeError::Serve)?;

    Ok(())
}
