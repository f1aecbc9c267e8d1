use std::future::Future;
use std::pin::Pin;

use crate::{OutboundMessage, PubSubMessage, PublishError};

// ════════════════════════════════════════════════════════════════
//  Topic Traits
// ════════════════════════════════════════════════════════════════

/// Публикация сообщений в topic.
///
/// Реализации: `PubSubClient` (Cloud Pub/Sub REST), `TopicRegistry`
/// (in-process, для local-режима и тестов). Хэндлеры держат его как
/// `Arc<dyn TopicPublisher>` — один экземпляр на процесс, только чтение.
pub trait TopicPublisher: Send + Sync {
    /// Опубликовать одно сообщение и дождаться подтверждения брокера.
    ///
    /// Ok = server-assigned message id.
    fn publish(&self, topic: &str, message: OutboundMessage)
        -> Pin<Box<dyn Future<Output = Result<String, PublishError>> + Send + '_>>;
}

/// Подписка на topic — асинхронный поток сообщений.
pub trait TopicSubscription: Send {
    /// Получить следующее сообщение. None = topic закрыт.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<PubSubMessage>> + Send + '_>>;
}
