use invites_api::PublishError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("config: {0}")]
    Config(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("access token: {0}")]
    Token(String),

    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("publish response carried no message id")]
    MissingMessageId,
}

impl ClientError {
    /// Convert to PublishError at the `TopicPublisher` seam.
    pub fn into_publish_error(self) -> PublishError {
        match self {
            ClientError::Config(msg) => PublishError::config(msg),
            ClientError::Http(e) if e.is_decode() => PublishError::format_err(e.to_string()),
            ClientError::Http(e) => PublishError::io(e.to_string()),
            e @ ClientError::Token(_) => PublishError::io(e.to_string()),
            e @ (ClientError::UnexpectedStatus { .. } | ClientError::MissingMessageId) => {
                PublishError::rejected(e.to_string())
            }
        }
    }
}
