use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use invites_api::TopicPublisher;
use invites_api_server::{intake_router, spawn_subscription, IntakeState};
use topic_engine::{Topic, TopicRegistry};

use crate::config::LocalArgs;
use crate::error::ServerError;

/// Intake + subscriber в одном процессе, без Pub/Sub.
pub async fn run(args: LocalArgs) -> Result<(), ServerError> {
    tracing::info!("local relay starting");

    let mut registry = TopicRegistry::new();
    registry.register(Topic::new(args.topic.clone()));

    let token = CancellationToken::new();

    let subscription = registry
        .subscribe(&args.topic, args.buffer)
        .await?;
    let sub_handle = spawn_subscription(subscription, token.clone());
    tracing::info!(topic = %args.topic, buffer = args.buffer, "subscriber attached");

    let publisher: Arc<dyn TopicPublisher> = Arc::new(registry);
    let state = IntakeState::new(publisher, args.topic.as_str(), token.clone());

    let result = super::serve_until_signal(args.http.port, intake_router(state), token.clone()).await;

    token.cancel();
    if let Err(e) = sub_handle.await {
        tracing::error!(error = %e, "subscription task failed");
    }
    result
}
