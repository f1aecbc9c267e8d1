use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::ClientError;

/// Токен обновляется заранее, за это время до истечения.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

pub struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Откуда брать bearer token для запросов к Pub/Sub.
pub enum TokenSource {
    /// Без авторизации (эмулятор).
    None,
    /// Токен задан извне и не обновляется.
    Static(String),
    /// Metadata server (Cloud Functions / Cloud Run / GCE), с кэшем.
    Metadata {
        url: String,
        cache: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn metadata(url: impl Into<String>) -> Self {
        TokenSource::Metadata {
            url: url.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TokenSource::None => "none",
            TokenSource::Static(_) => "static",
            TokenSource::Metadata { .. } => "metadata",
        }
    }

    /// Текущий токен; `None` — запрос уходит без Authorization.
    pub async fn token(&self, http: &reqwest::Client) -> Result<Option<String>, ClientError> {
        match self {
            TokenSource::None => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Metadata { url, cache } => {
                let mut cached = cache.lock().await;
                if let Some(token) = cached.as_ref() {
                    if Instant::now() + REFRESH_MARGIN < token.expires_at {
                        return Ok(Some(token.value.clone()));
                    }
                }

                let fresh = fetch_metadata_token(http, url).await?;
                let value = fresh.access_token.clone();
                tracing::debug!(expires_in = fresh.expires_in, "refreshed access token");
                *cached = Some(CachedToken {
                    value: fresh.access_token,
                    expires_at: Instant::now() + Duration::from_secs(fresh.expires_in),
                });
                Ok(Some(value))
            }
        }
    }
}

async fn fetch_metadata_token(http: &reqwest::Client, url: &str) -> Result<MetadataToken, ClientError> {
    let res = http
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| ClientError::Token(format!("metadata server: {e}")))?;

    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(ClientError::Token(format!("metadata server: status {status} body={body}")));
    }

    let token: MetadataToken = res
        .json()
        .await
        .map_err(|e| ClientError::Token(format!("metadata response: {e}")))?;
    if token.access_token.is_empty() {
        return Err(ClientError::Token("metadata server returned empty token".into()));
    }
    Ok(token)
}
