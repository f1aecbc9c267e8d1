pub mod error;
pub mod topic;
pub mod types;

pub use error::{ErrorKind, PublishError, VoteError};
pub use topic::{TopicPublisher, TopicSubscription};
pub use types::{InboundDelivery, OutboundMessage, PubSubMessage, PushEnvelope, VoteMessage, VoteRequest};

