use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::{Result, SmartmarksError};
use crate::auth::BearerSource;
use crate::backend::BookmarkStore;
use crate::config::BackendConfig;
use crate::domain::{Bookmark, BookmarkId, NewBookmark, UserId};

pub(crate) const USER_AGENT: &str = concat!("smartmarks/", env!("CARGO_PKG_VERSION"));

/// Bookmark store backed by the hosted PostgREST data API.
pub struct RestStore {
    client: Client,
    table_url: Url,
    anon_key: String,
    token: Arc<dyn BearerSource + Send + Sync>,
}

impl RestStore {
    pub fn new(config: &BackendConfig, token: Arc<dyn BearerSource + Send + Sync>) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()?;

        let table_url = config.base_url()?.join("rest/v1/")?.join(&config.table)?;

        Ok(Self {
            client,
            table_url,
            anon_key: config.anon_key.clone(),
            token,
        })
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.token.bearer().await?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&self.anon_key)?);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            header_value(&format!("Bearer {}", token))?,
        );
        Ok(headers)
    }

    fn url_with(&self, pairs: &[(&str, String)]) -> Url {
        let mut url = self.table_url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        url
    }
}

#[async_trait]
impl BookmarkStore for RestStore {
    async fn list(&self, owner: &UserId) -> Result<Vec<Bookmark>> {
        let url = self.url_with(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner)),
            ("order", "created_at.desc".to_string()),
        ]);
        debug!("GET {}", url);

        let response = self.client.get(url).headers(self.headers().await?).send().await?;
        let rows = ensure_success(response).await?.json::<Vec<Bookmark>>().await?;
        Ok(rows)
    }

    async fn insert(&self, bookmark: &NewBookmark) -> Result<Bookmark> {
        debug!("POST {} ({})", self.table_url, bookmark.url);

        let response = self
            .client
            .post(self.table_url.clone())
            .headers(self.headers().await?)
            .header("Prefer", "return=representation")
            .json(&[bookmark])
            .send()
            .await?;

        let mut rows = ensure_success(response).await?.json::<Vec<Bookmark>>().await?;
        if rows.is_empty() {
            return Err(SmartmarksError::Other(
                "Insert returned no row".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete(&self, owner: &UserId, id: &BookmarkId) -> Result<()> {
        let url = self.url_with(&[
            ("id", format!("eq.{}", id)),
            ("user_id", format!("eq.{}", owner)),
        ]);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .headers(self.headers().await?)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SmartmarksError::Config(format!("Invalid header value: {}", e)))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Pass a 2xx response through; turn anything else into [`SmartmarksError::Api`].
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SmartmarksError::Api {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        }),
    })
}

/// Pull a human-readable message out of a PostgREST or GoTrue error body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .or(parsed.error)
}
