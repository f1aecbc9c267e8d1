use crate::error::ClientError;

pub const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Настройки Pub/Sub клиента. Заполняются при старте (CLI/env)
/// и передаются в `PubSubClient::new` по значению.
#[derive(Debug, Clone, Default)]
pub struct PubSubConfig {
    /// Cloud project, в котором живут topic'и.
    pub project_id: String,
    /// Переопределение REST endpoint'а (`PUBSUB_ENDPOINT`).
    pub endpoint: Option<String>,
    /// `host:port` эмулятора (`PUBSUB_EMULATOR_HOST`). Отключает авторизацию.
    pub emulator_host: Option<String>,
    /// Готовый bearer token (`PUBSUB_ACCESS_TOKEN`). Иначе — metadata server.
    pub access_token: Option<String>,
    /// URL metadata server'а для получения токена.
    pub metadata_url: Option<String>,
}

impl PubSubConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.project_id.trim().is_empty() {
            return Err(ClientError::Config("project id is empty".into()));
        }
        if self.project_id.contains('/') {
            return Err(ClientError::Config(format!(
                "project id '{}' must not contain '/'",
                self.project_id
            )));
        }
        Ok(())
    }

    /// Эмулятор имеет приоритет над явным endpoint'ом, как в официальных клиентах.
    pub fn resolved_endpoint(&self) -> String {
        if let Some(host) = self.emulator_host.as_deref().filter(|h| !h.is_empty()) {
            return format!("http://{host}");
        }
        self.endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn uses_emulator(&self) -> bool {
        self.emulator_host.as_deref().is_some_and(|h| !h.is_empty())
    }
}
