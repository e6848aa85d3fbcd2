//! One-shot local HTTP listener that receives the OAuth redirect.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::app::{Result, SmartmarksError};

pub const CALLBACK_PATH: &str = "/callback";

/// How long in-flight responses get to finish once the code has arrived.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SIGNED_IN_PAGE: &str = "<!doctype html><html><body style=\"font-family:sans-serif\">\
<h2>Signed in to SmartMarks</h2><p>You can close this tab and return to the terminal.</p>\
</body></html>";

const FAILED_PAGE: &str = "<!doctype html><html><body style=\"font-family:sans-serif\">\
<h2>Sign-in failed</h2><p>Return to the terminal for details.</p></body></html>";

pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH)
}

/// Query string of the redirect back from the provider.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// The authorization code, or the reason there is none.
    pub fn into_code(self) -> std::result::Result<String, String> {
        match self.code.filter(|code| !code.is_empty()) {
            Some(code) => Ok(code),
            None => Err(self
                .error_description
                .or(self.error)
                .unwrap_or_else(|| "Redirect carried no authorization code".to_string())),
        }
    }
}

type Outcome = std::result::Result<String, String>;

/// Sender for the first callback; later requests find it taken.
type OutcomeSlot = Arc<Mutex<Option<oneshot::Sender<Outcome>>>>;

fn router(slot: OutcomeSlot) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(callback_handler))
        .with_state(slot)
}

async fn callback_handler(
    State(slot): State<OutcomeSlot>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<&'static str>) {
    let outcome = params.into_code();
    let reply = match &outcome {
        Ok(_) => (StatusCode::OK, Html(SIGNED_IN_PAGE)),
        Err(reason) => {
            warn!("Sign-in redirect carried an error: {}", reason);
            (StatusCode::BAD_REQUEST, Html(FAILED_PAGE))
        }
    };

    let sender = slot.lock().ok().and_then(|mut guard| guard.take());
    match sender {
        Some(sender) => {
            let _ = sender.send(outcome);
        }
        None => debug!("Ignoring repeated sign-in callback"),
    }
    reply
}

/// Serve the callback route until the redirect arrives or `timeout` elapses.
pub async fn wait_for_code(listener: TcpListener, timeout: Duration) -> Result<String> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = router(Arc::new(Mutex::new(Some(outcome_tx))));

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    let outcome = tokio::time::timeout(timeout, outcome_rx).await;

    let _ = stop_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Err(e))) => warn!("Callback listener failed: {}", e),
        Err(_) => debug!("Callback listener did not drain in time"),
        _ => {}
    }

    match outcome {
        Err(_) => Err(SmartmarksError::Auth(
            "Timed out waiting for browser sign-in".to_string(),
        )),
        Ok(Err(_)) => Err(SmartmarksError::Auth(
            "Callback listener stopped before sign-in finished".to_string(),
        )),
        Ok(Ok(outcome)) => outcome.map_err(SmartmarksError::Auth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(code: Option<&str>, error: Option<&str>, description: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(String::from),
            error: error.map(String::from),
            error_description: description.map(String::from),
        }
    }

    #[test]
    fn test_code_is_extracted() {
        assert_eq!(params(Some("abc123"), None, None).into_code(), Ok("abc123".into()));
    }

    #[test]
    fn test_provider_error_prefers_description() {
        assert_eq!(
            params(None, Some("access_denied"), Some("User cancelled")).into_code(),
            Err("User cancelled".into())
        );
        assert_eq!(
            params(None, Some("access_denied"), None).into_code(),
            Err("access_denied".into())
        );
    }

    #[test]
    fn test_empty_code_is_rejected() {
        assert!(params(Some(""), None, None).into_code().is_err());
        assert!(CallbackParams::default().into_code().is_err());
    }

    async fn spawn_listener(timeout: Duration) -> (String, tokio::task::JoinHandle<Result<String>>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (base, tokio::spawn(wait_for_code(listener, timeout)))
    }

    #[tokio::test]
    async fn test_wait_for_code_over_http() {
        let (base, waiter) = spawn_listener(Duration::from_secs(5)).await;
        let client = reqwest::Client::new();

        let favicon = client.get(format!("{}/favicon.ico", base)).send().await.unwrap();
        assert_eq!(favicon.status(), reqwest::StatusCode::NOT_FOUND);

        let reply = client
            .get(format!("{}/callback?code=xyz&state=ignored", base))
            .send()
            .await
            .unwrap();
        assert_eq!(reply.status(), reqwest::StatusCode::OK);
        assert!(reply.text().await.unwrap().contains("Signed in"));

        assert_eq!(waiter.await.unwrap().unwrap(), "xyz");
    }

    #[tokio::test]
    async fn test_denied_redirect_is_an_auth_error() {
        let (base, waiter) = spawn_listener(Duration::from_secs(5)).await;

        let reply = reqwest::get(format!(
            "{}/callback?error=access_denied&error_description=User+cancelled",
            base
        ))
        .await
        .unwrap();
        assert_eq!(reply.status(), reqwest::StatusCode::BAD_REQUEST);

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, SmartmarksError::Auth(reason) if reason == "User cancelled"));
    }

    #[tokio::test]
    async fn test_times_out_without_redirect() {
        let (_base, waiter) = spawn_listener(Duration::from_millis(50)).await;
        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, SmartmarksError::Auth(_)));
    }
}
