#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("pubsub client: {0}")]
    Client(#[from] pubsub_client::ClientError),

    #[error("{0}")]
    Serve(#[from] invites_api_server::ServeError),

    #[error("topic: {0}")]
    Topic(#[from] topic_engine::TopicError),

    #[error("task: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
