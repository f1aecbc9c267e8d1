/// Category of a publish error. Lets the HTTP layer and logs tell
/// a misconfigured client from a transient transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration — permanent, fail at startup.
    Config,
    /// I/O or network error on the way to the broker.
    Io,
    /// Broker answered, but refused the message (non-2xx, no message id).
    Rejected,
    /// Payload or response could not be (de)serialized.
    Format,
    /// Wait for acknowledgment was aborted (shutdown, dropped request).
    Cancelled,
    /// Topic does not exist.
    NotFound,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Rejected => f.write_str("rejected"),
            ErrorKind::Format => f.write_str("format"),
            ErrorKind::Cancelled => f.write_str("cancelled"),
            ErrorKind::NotFound => f.write_str("not_found"),
        }
    }
}

/// Единая ошибка публикации для всех реализаций `TopicPublisher`.
///
/// Несёт `ErrorKind` для категоризации и человекочитаемое сообщение.
/// `From` impls назначают kind автоматически, чтобы `?` работал
/// в реализациях без ручного маппинга.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishError {
    kind: ErrorKind,
    message: String,
}

impl PublishError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, msg)
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected, msg)
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, msg)
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, msg)
    }

    pub fn not_found(topic: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("topic '{topic}' not found"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PublishError {}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self { Self { kind: ErrorKind::Io, message: e.to_string() } }
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self { Self { kind: ErrorKind::Format, message: e.to_string() } }
}

/// Ошибки разбора и валидации голоса.
#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("decode vote request: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("encode vote message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_carries_kind() {
        let err = PublishError::rejected("status 403");
        assert_eq!(format!("{err:?}"), "[rejected] status 403");
        assert_eq!(err.to_string(), "status 403");
    }

    #[test]
    fn json_error_is_format_kind() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: PublishError = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn not_found_names_topic() {
        let err = PublishError::not_found("invites");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.message().contains("'invites'"));
    }
}
