use invites_api::PublishError;

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("topic '{0}' not found")]
    NotFound(String),
}

impl TopicError {
    /// Convert to PublishError preserving the category.
    pub fn into_publish_error(self) -> PublishError {
        match self {
            TopicError::NotFound(name) => PublishError::not_found(&name),
        }
    }
}
