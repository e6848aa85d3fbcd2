use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{Result, SmartmarksError};
use crate::auth::callback::{self, redirect_uri};
use crate::auth::pkce::PkcePair;
use crate::auth::{AccessToken, AuthProvider, BearerSource, SessionFile, StoredSession};
use crate::backend::rest::{ensure_success, USER_AGENT};
use crate::config::BackendConfig;
use crate::domain::{Identity, UserId};

const SIGN_IN_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        let meta = user.user_metadata;
        Identity {
            id: UserId(user.id),
            email: user.email.filter(|e| !e.is_empty()),
            full_name: meta.full_name.or(meta.name),
            avatar_url: meta.avatar_url.or(meta.picture),
        }
    }
}

/// Auth provider for the hosted GoTrue service.
///
/// Sign-in opens the provider's consent page in the system browser and
/// receives the authorization code on a local callback port (PKCE flow).
/// As a [`BearerSource`] it renews the access token shortly before expiry.
pub struct GoTrueAuth {
    client: Client,
    auth_url: Url,
    anon_key: String,
    provider: String,
    callback_port: u16,
    session_file: SessionFile,
    token: AccessToken,
    /// Held while a refresh is in flight so concurrent requests share it.
    refreshing: Mutex<()>,
}

impl GoTrueAuth {
    pub fn new(config: &BackendConfig, session_file: SessionFile) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            auth_url: config.base_url()?.join("auth/v1/")?,
            anon_key: config.anon_key.clone(),
            provider: config.provider.clone(),
            callback_port: config.callback_port,
            session_file,
            token: AccessToken::default(),
            refreshing: Mutex::new(()),
        })
    }

    fn authorize_url(&self, challenge: &str) -> Result<Url> {
        let mut url = self.auth_url.join("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", &self.provider)
            .append_pair("redirect_to", &redirect_uri(self.callback_port))
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }

    fn token_url(&self, grant_type: &str) -> Result<Url> {
        let mut url = self.auth_url.join("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    async fn request_tokens(&self, grant_type: &str, body: serde_json::Value) -> Result<TokenResponse> {
        let url = self.token_url(grant_type)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<Identity> {
        let response = self
            .client
            .get(self.auth_url.join("user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let user: UserResponse = ensure_success(response).await?.json().await?;
        Ok(user.into())
    }

    /// Persist fresh tokens and make them the active bearer token.
    fn remember(&self, tokens: &TokenResponse) -> Result<StoredSession> {
        let stored = StoredSession {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(tokens.expires_in),
        };
        self.session_file.save(&stored)?;
        self.token.set(Some(stored.clone()));
        Ok(stored)
    }

    /// Trade the refresh token for new tokens. `None` means the service
    /// revoked the session, which is then forgotten.
    async fn refresh(&self, stored: &StoredSession) -> Result<Option<StoredSession>> {
        let refreshed = self
            .request_tokens(
                "refresh_token",
                json!({ "refresh_token": stored.refresh_token }),
            )
            .await;
        match refreshed {
            Ok(tokens) => self.remember(&tokens).map(Some),
            Err(e) if is_rejected(&e) => {
                info!("Stored session was revoked: {}", e);
                self.forget()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn forget(&self) -> Result<()> {
        self.token.set(None);
        self.session_file.clear()
    }
}

/// The service refused the stored credentials; they will never work again.
fn is_rejected(error: &SmartmarksError) -> bool {
    error.is_unauthorized() || matches!(error, SmartmarksError::Api { status: 400, .. })
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    async fn restore(&self) -> Result<Option<Identity>> {
        let Some(mut stored) = self.session_file.load()? else {
            return Ok(None);
        };

        if stored.is_expired(Utc::now()) {
            debug!("Stored session expired, refreshing");
            match self.refresh(&stored).await? {
                Some(refreshed) => stored = refreshed,
                None => return Ok(None),
            }
        }

        self.token.set(Some(stored.clone()));
        match self.fetch_user(&stored.access_token).await {
            Ok(identity) => {
                info!("Restored session for {}", identity.display_name());
                Ok(Some(identity))
            }
            Err(e) if is_rejected(&e) => {
                info!("Stored session was rejected: {}", e);
                self.forget()?;
                Ok(None)
            }
            Err(e) => {
                self.token.set(None);
                Err(e)
            }
        }
    }

    async fn sign_in(&self) -> Result<Identity> {
        let pkce = PkcePair::generate();
        // Bind before opening the browser so the redirect cannot beat us.
        let listener = TcpListener::bind(("127.0.0.1", self.callback_port)).await?;
        let url = self.authorize_url(&pkce.challenge)?;

        info!("Opening browser for {} sign-in", self.provider);
        open::that(url.as_str()).map_err(|e| {
            SmartmarksError::Auth(format!("Could not open browser ({}); visit {}", e, url))
        })?;

        let code = callback::wait_for_code(listener, SIGN_IN_TIMEOUT).await?;
        let tokens = self
            .request_tokens(
                "pkce",
                json!({ "auth_code": code, "code_verifier": pkce.verifier }),
            )
            .await?;
        let stored = self.remember(&tokens)?;

        let identity = match tokens.user {
            Some(user) => user.into(),
            None => self.fetch_user(&stored.access_token).await?,
        };
        info!("Signed in as {}", identity.display_name());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.token.get();
        self.forget()?;

        let Some(token) = token else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.auth_url.join("logout")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;
        if let Err(e) = ensure_success(response).await {
            warn!("Remote sign-out failed: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl BearerSource for GoTrueAuth {
    async fn bearer(&self) -> Result<String> {
        let current = self.token.session().ok_or(SmartmarksError::NotSignedIn)?;
        if !current.is_expired(Utc::now()) {
            return Ok(current.access_token);
        }

        let _guard = self.refreshing.lock().await;
        // Someone else may have refreshed while we waited.
        let current = self.token.session().ok_or(SmartmarksError::NotSignedIn)?;
        if !current.is_expired(Utc::now()) {
            return Ok(current.access_token);
        }

        debug!("Access token about to expire, refreshing");
        match self.refresh(&current).await? {
            Some(refreshed) => Ok(refreshed.access_token),
            None => Err(SmartmarksError::NotSignedIn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use tempfile::TempDir;

    fn auth_at(dir: &TempDir, url: &str) -> GoTrueAuth {
        let config = BackendConfig {
            url: url.into(),
            anon_key: "anon".into(),
            ..BackendConfig::default()
        };
        GoTrueAuth::new(&config, SessionFile::new(dir.path().join("session.json"))).unwrap()
    }

    fn auth(dir: &TempDir) -> GoTrueAuth {
        auth_at(dir, "https://demo.supabase.co")
    }

    fn session(access: &str, expires_in: i64) -> StoredSession {
        StoredSession {
            access_token: access.into(),
            refresh_token: format!("refresh-{}", access),
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
        }
    }

    /// Local token endpoint answering every request with `status` and `body`.
    async fn token_endpoint(status: StatusCode, body: Value) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/auth/v1/token",
            post(move || {
                let counter = counter.clone();
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, Json(body))
                }
            }),
        );

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await });
        (base, hits)
    }

    #[test]
    fn test_authorize_url() {
        let dir = TempDir::new().unwrap();
        let url = auth(&dir).authorize_url("challenge").unwrap();

        assert_eq!(url.path(), "/auth/v1/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&(
            "redirect_to".into(),
            "http://127.0.0.1:54321/callback".into()
        )));
        assert!(pairs.contains(&("code_challenge_method".into(), "s256".into())));
    }

    #[test]
    fn test_token_url() {
        let dir = TempDir::new().unwrap();
        let url = auth(&dir).token_url("refresh_token").unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/auth/v1/token?grant_type=refresh_token"
        );
    }

    #[test]
    fn test_user_response_into_identity() {
        let json = r#"{
            "id": "8d0fd2b3",
            "email": "ada@example.com",
            "user_metadata": {"name": "Ada", "picture": "https://img/ada.png"}
        }"#;
        let identity: Identity = serde_json::from_str::<UserResponse>(json).unwrap().into();
        assert_eq!(identity.id, UserId::from("8d0fd2b3"));
        assert_eq!(identity.full_name.as_deref(), Some("Ada"));
        assert_eq!(identity.avatar_url.as_deref(), Some("https://img/ada.png"));
    }

    #[tokio::test]
    async fn test_restore_without_saved_session() {
        let dir = TempDir::new().unwrap();
        let auth = auth(&dir);
        assert_eq!(auth.restore().await.unwrap(), None);
        assert_eq!(auth.token.get(), None);
    }

    #[tokio::test]
    async fn test_sign_out_without_token_clears_local_state() {
        let dir = TempDir::new().unwrap();
        let auth = auth(&dir);
        auth.session_file
            .save(&StoredSession {
                access_token: "a".into(),
                refresh_token: "r".into(),
                expires_at: Utc::now(),
            })
            .unwrap();

        auth.sign_out().await.unwrap();
        assert_eq!(auth.session_file.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_bearer_requires_a_session() {
        let dir = TempDir::new().unwrap();
        let err = auth(&dir).bearer().await.unwrap_err();
        assert!(matches!(err, SmartmarksError::NotSignedIn));
    }

    #[tokio::test]
    async fn test_fresh_token_is_used_without_refreshing() {
        let dir = TempDir::new().unwrap();
        let (base, hits) = token_endpoint(StatusCode::OK, json!({})).await;
        let auth = auth_at(&dir, &base);
        auth.token.set(Some(session("a1", 3600)));

        assert_eq!(auth.bearer().await.unwrap(), "a1");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        let dir = TempDir::new().unwrap();
        let (base, hits) = token_endpoint(
            StatusCode::OK,
            json!({ "access_token": "a2", "refresh_token": "r2", "expires_in": 3600 }),
        )
        .await;
        let auth = auth_at(&dir, &base);
        auth.token.set(Some(session("a1", 30)));

        assert_eq!(auth.bearer().await.unwrap(), "a2");
        assert_eq!(auth.bearer().await.unwrap(), "a2");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let saved = auth.session_file.load().unwrap().unwrap();
        assert_eq!(saved.access_token, "a2");
        assert_eq!(saved.refresh_token, "r2");
        assert!(!saved.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_signs_out_locally() {
        let dir = TempDir::new().unwrap();
        let (base, _hits) = token_endpoint(
            StatusCode::BAD_REQUEST,
            json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token" }),
        )
        .await;
        let auth = auth_at(&dir, &base);
        let expired = session("a1", -10);
        auth.session_file.save(&expired).unwrap();
        auth.token.set(Some(expired));

        let err = auth.bearer().await.unwrap_err();
        assert!(matches!(err, SmartmarksError::NotSignedIn));
        assert_eq!(auth.token.get(), None);
        assert_eq!(auth.session_file.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_drops_a_revoked_saved_session() {
        let dir = TempDir::new().unwrap();
        let (base, _hits) = token_endpoint(
            StatusCode::UNAUTHORIZED,
            json!({ "msg": "Invalid Refresh Token" }),
        )
        .await;
        let auth = auth_at(&dir, &base);
        auth.session_file.save(&session("a1", -10)).unwrap();

        assert_eq!(auth.restore().await.unwrap(), None);
        assert_eq!(auth.session_file.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_data_requests_carry_the_refreshed_token() {
        use crate::backend::{BookmarkStore, RestStore};
        use axum::http::HeaderMap;
        use axum::routing::get;

        let app = Router::new()
            .route(
                "/auth/v1/token",
                post(|| async {
                    Json(json!({ "access_token": "a2", "refresh_token": "r2", "expires_in": 3600 }))
                }),
            )
            .route(
                "/rest/v1/bookmarks",
                get(|headers: HeaderMap| async move {
                    let authorized = headers
                        .get("authorization")
                        .map(|value| value.as_bytes() == b"Bearer a2")
                        .unwrap_or(false);
                    if authorized {
                        (StatusCode::OK, Json(json!([])))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "JWT expired" })))
                    }
                }),
            );
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await });

        let dir = TempDir::new().unwrap();
        let auth = Arc::new(auth_at(&dir, &base));
        auth.token.set(Some(session("a1", -10)));

        let config = BackendConfig {
            url: base.clone(),
            anon_key: "anon".into(),
            ..BackendConfig::default()
        };
        let store = RestStore::new(&config, auth.clone()).unwrap();
        let rows = store.list(&UserId::from("u1")).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(auth.token.get().as_deref(), Some("a2"));
    }
}
