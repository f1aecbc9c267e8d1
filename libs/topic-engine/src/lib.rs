//! In-process topic for running intake and subscriber in one process.
//!
//! Delivery is ordered and back-pressured: `publish` returns the message id
//! only after every live subscriber has accepted the message into its
//! buffer. A full buffer makes the publisher wait.

pub mod error;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use invites_api::{
    OutboundMessage, PubSubMessage, PublishError, TopicPublisher, TopicSubscription,
};

pub use error::TopicError;

// ═══════════════════════════════════════════════════════════════
//  Subscription
// ═══════════════════════════════════════════════════════════════

/// Приёмная сторона подписки. `None` — topic удалён.
pub struct LocalSubscription {
    rx: mpsc::Receiver<PubSubMessage>,
}

impl TopicSubscription for LocalSubscription {
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Option<PubSubMessage>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Topic
// ═══════════════════════════════════════════════════════════════

struct Fanout {
    last_id: u64,
    subscribers: Vec<mpsc::Sender<PubSubMessage>>,
}

/// Сообщения не хранятся: без подписчиков публикация просто теряется,
/// подписчик видит только то, что опубликовано после `subscribe`.
pub struct Topic {
    name: String,
    fanout: Mutex<Fanout>,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fanout: Mutex::new(Fanout {
                last_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// `buffer` — сколько неразобранных сообщений держит подписка (минимум 1).
    pub async fn subscribe(&self, buffer: usize) -> LocalSubscription {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.fanout.lock().await.subscribers.push(tx);
        LocalSubscription { rx }
    }

    /// Lock is held for the whole fan-out, so ids and delivery order agree
    /// across concurrent publishers.
    pub async fn publish(&self, message: OutboundMessage) -> Result<String, TopicError> {
        let mut fanout = self.fanout.lock().await;
        fanout.last_id += 1;
        let id = fanout.last_id.to_string();

        let delivered = PubSubMessage {
            data: message.data,
            attributes: message.attributes,
            message_id: Some(id.clone()),
            publish_time: None,
        };

        let mut gone = 0;
        for tx in &fanout.subscribers {
            if tx.send(delivered.clone()).await.is_err() {
                gone += 1;
            }
        }
        if gone > 0 {
            fanout.subscribers.retain(|tx| !tx.is_closed());
            tracing::debug!(topic = %self.name, gone, "dropped closed subscriptions");
        }
        if fanout.subscribers.is_empty() {
            tracing::warn!(topic = %self.name, message_id = %id, "no subscribers, message discarded");
        }

        Ok(id)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

/// Набор локальных topic'ов по имени; стоит на месте Pub/Sub клиента
/// за `TopicPublisher`.
#[derive(Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Arc<Topic>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, topic: Topic) {
        self.topics.insert(topic.name.clone(), Arc::new(topic));
    }

    pub fn get(&self, topic: &str) -> Result<Arc<Topic>, TopicError> {
        self.topics
            .get(topic)
            .cloned()
            .ok_or_else(|| TopicError::NotFound(topic.to_string()))
    }

    pub async fn subscribe(
        &self,
        topic: &str,
        buffer: usize,
    ) -> Result<Box<dyn TopicSubscription>, TopicError> {
        let subscription = self.get(topic)?.subscribe(buffer).await;
        Ok(Box::new(subscription))
    }
}

impl TopicPublisher for TopicRegistry {
    fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, PublishError>> + Send + '_>> {
        let target = self.get(topic);
        Box::pin(async move {
            let result = match target {
                Ok(t) => t.publish(message).await,
                Err(e) => Err(e),
            };
            result.map_err(TopicError::into_publish_error)
        })
    }
}
