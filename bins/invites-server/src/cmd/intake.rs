use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use invites_api::TopicPublisher;
use invites_api_server::{intake_router, IntakeState};
use pubsub_client::PubSubClient;

use crate::config::IntakeArgs;
use crate::error::ServerError;

pub async fn run(args: IntakeArgs) -> Result<(), ServerError> {
    tracing::info!("accept-invites starting");
    args.validate()?;

    // Клиент создаётся один раз и разделяется всеми запросами.
    let client = PubSubClient::new(args.pubsub_config())?;
    tracing::info!(topic = %client.topic_path(&args.topic), "publishing votes");
    let publisher: Arc<dyn TopicPublisher> = Arc::new(client);

    let token = CancellationToken::new();
    let state = IntakeState::new(publisher, args.topic.as_str(), token.clone());

    super::serve_until_signal(args.http.port, intake_router(state), token).await
}
