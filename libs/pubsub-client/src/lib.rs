//! Minimal Cloud Pub/Sub publisher over the REST API.
//!
//! One `PubSubClient` is built at startup and shared behind
//! `Arc<dyn TopicPublisher>`; it is safe for concurrent use and holds
//! no state besides the cached access token.

pub mod auth;
pub mod config;
pub mod error;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use invites_api::{OutboundMessage, PublishError, TopicPublisher};

pub use auth::TokenSource;
pub use config::{PubSubConfig, DEFAULT_ENDPOINT, METADATA_TOKEN_URL};
pub use error::ClientError;

#[derive(Serialize)]
struct PublishRequest<'a> {
    messages: &'a [OutboundMessage],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

pub struct PubSubClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    auth: TokenSource,
}

impl PubSubClient {
    pub fn new(config: PubSubConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let endpoint = config.resolved_endpoint();

        let auth = if config.uses_emulator() {
            TokenSource::None
        } else if let Some(token) = config.access_token.filter(|t| !t.is_empty()) {
            TokenSource::Static(token)
        } else {
            TokenSource::metadata(
                config
                    .metadata_url
                    .unwrap_or_else(|| METADATA_TOKEN_URL.to_string()),
            )
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("invites/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::info!(
            project = %config.project_id,
            endpoint = %endpoint,
            auth = auth.kind(),
            "pubsub client ready"
        );

        Ok(Self {
            http,
            endpoint,
            project_id: config.project_id,
            auth,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Полное имя topic'а: `projects/{project}/topics/{topic}`.
    pub fn topic_path(&self, topic: &str) -> String {
        format!("projects/{}/topics/{}", self.project_id, topic)
    }

    /// Опубликовать одно сообщение и вернуть присвоенный message id.
    pub async fn publish_message(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Result<String, ClientError> {
        if topic.is_empty() {
            return Err(ClientError::Config("topic id is empty".into()));
        }

        let url = format!("{}/v1/{}:publish", self.endpoint, self.topic_path(topic));
        let body = PublishRequest {
            messages: std::slice::from_ref(&message),
        };

        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = self.auth.token(&self.http).await? {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, body });
        }

        let parsed: PublishResponse = res.json().await?;
        parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or(ClientError::MissingMessageId)
    }
}

impl TopicPublisher for PubSubClient {
    fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, PublishError>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move {
            self.publish_message(&topic, message)
                .await
                .map_err(ClientError::into_publish_error)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use invites_api::ErrorKind;
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct SeenPublish {
        path: String,
        auth: Option<String>,
        body: serde_json::Value,
    }

    #[derive(Clone, Default)]
    struct FakePubSub {
        seen: Arc<Mutex<Vec<SeenPublish>>>,
        token_fetches: Arc<AtomicUsize>,
        reject: bool,
        no_ids: bool,
    }

    async fn fake_publish(
        State(state): State<FakePubSub>,
        Path((project, topic)): Path<(String, String)>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        if state.reject {
            return (StatusCode::FORBIDDEN, "permission denied").into_response();
        }
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state.seen.lock().unwrap().push(SeenPublish {
            path: format!("{project}/{topic}"),
            auth,
            body,
        });
        if state.no_ids {
            return Json(json!({})).into_response();
        }
        Json(json!({ "messageIds": ["m-1"] })).into_response()
    }

    async fn fake_token(State(state): State<FakePubSub>, headers: HeaderMap) -> Response {
        if headers.get("metadata-flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
            return StatusCode::FORBIDDEN.into_response();
        }
        state.token_fetches.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "access_token": "tok-1", "expires_in": 3600, "token_type": "Bearer" }))
            .into_response()
    }

    async fn spawn_fake(state: FakePubSub) -> String {
        let app = Router::new()
            .route("/v1/projects/{project}/topics/{topic}", post(fake_publish))
            .route("/token", get(fake_token))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config_for(base: &str) -> PubSubConfig {
        PubSubConfig {
            project_id: "my-project".into(),
            endpoint: Some(base.to_string()),
            metadata_url: Some(format!("{base}/token")),
            ..PubSubConfig::default()
        }
    }

    #[tokio::test]
    async fn publishes_base64_data_with_static_token() {
        let state = FakePubSub::default();
        let base = spawn_fake(state.clone()).await;
        let mut cfg = config_for(&base);
        cfg.access_token = Some("secret".into());
        let client = PubSubClient::new(cfg).unwrap();

        let id = client
            .publish("invites", OutboundMessage::new(br#"{"name":"Alice","vote":"yes"}"#.to_vec()))
            .await
            .unwrap();
        assert_eq!(id, "m-1");

        let seen = state.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "my-project/invites:publish");
        assert_eq!(seen[0].auth.as_deref(), Some("Bearer secret"));
        assert_eq!(
            seen[0].body,
            json!({ "messages": [{ "data": "eyJuYW1lIjoiQWxpY2UiLCJ2b3RlIjoieWVzIn0=" }] })
        );
    }

    #[tokio::test]
    async fn metadata_token_is_cached() {
        let state = FakePubSub::default();
        let base = spawn_fake(state.clone()).await;
        let client = PubSubClient::new(config_for(&base)).unwrap();

        client.publish("invites", OutboundMessage::new(b"a".to_vec())).await.unwrap();
        client.publish("invites", OutboundMessage::new(b"b".to_vec())).await.unwrap();

        assert_eq!(state.token_fetches.load(Ordering::SeqCst), 1);
        let seen = state.seen.lock().unwrap();
        assert!(seen.iter().all(|s| s.auth.as_deref() == Some("Bearer tok-1")));
    }

    #[tokio::test]
    async fn emulator_sends_no_authorization() {
        let state = FakePubSub::default();
        let base = spawn_fake(state.clone()).await;
        let cfg = PubSubConfig {
            project_id: "my-project".into(),
            emulator_host: Some(base.trim_start_matches("http://").to_string()),
            access_token: Some("ignored".into()),
            ..PubSubConfig::default()
        };
        let client = PubSubClient::new(cfg).unwrap();

        client.publish("invites", OutboundMessage::new(b"x".to_vec())).await.unwrap();
        assert_eq!(state.seen.lock().unwrap()[0].auth, None);
        assert_eq!(state.token_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let state = FakePubSub { reject: true, ..FakePubSub::default() };
        let base = spawn_fake(state).await;
        let mut cfg = config_for(&base);
        cfg.access_token = Some("secret".into());
        let client = PubSubClient::new(cfg).unwrap();

        let err = client
            .publish("invites", OutboundMessage::new(b"x".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(err.message().contains("403"));
    }

    #[tokio::test]
    async fn missing_message_id_is_rejected() {
        let state = FakePubSub { no_ids: true, ..FakePubSub::default() };
        let base = spawn_fake(state).await;
        let mut cfg = config_for(&base);
        cfg.access_token = Some("secret".into());
        let client = PubSubClient::new(cfg).unwrap();

        let err = client
            .publish("invites", OutboundMessage::new(b"x".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
    }

    #[tokio::test]
    async fn unreachable_broker_is_io() {
        let cfg = PubSubConfig {
            project_id: "my-project".into(),
            endpoint: Some("http://127.0.0.1:1".into()),
            access_token: Some("secret".into()),
            ..PubSubConfig::default()
        };
        let client = PubSubClient::new(cfg).unwrap();
        let err = client
            .publish("invites", OutboundMessage::new(b"x".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn topic_path_and_validation() {
        let client = PubSubClient::new(PubSubConfig::new("p1")).unwrap();
        assert_eq!(client.topic_path("invites"), "projects/p1/topics/invites");
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert!(PubSubClient::new(PubSubConfig::new("")).is_err());
    }
}
