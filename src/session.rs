//! Identity session holder.
//!
//! One [`SessionContext`] exists per running application. It owns the
//! current identity and publishes every change on a watch channel, so
//! consumers (the form, the feed, the shell) never hold their own copy.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::app::Result;
use crate::auth::AuthProvider;
use crate::domain::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    /// True only until the initial restore attempt has finished.
    pub is_loading: bool,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}

pub struct SessionContext {
    provider: Arc<dyn AuthProvider + Send + Sync>,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn AuthProvider + Send + Sync>) -> Self {
        let (state, _) = watch::channel(SessionState {
            identity: None,
            is_loading: true,
        });
        Self { provider, state }
    }

    /// Restore a persisted session, then leave the loading state.
    ///
    /// A failed restore is logged and treated as signed out.
    pub async fn init(&self) {
        let identity = match self.provider.restore().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Could not restore session: {}", e);
                None
            }
        };

        if let Some(identity) = &identity {
            info!("Session restored for {}", identity.display_name());
        }
        self.state.send_replace(SessionState {
            identity,
            is_loading: false,
        });
    }

    pub async fn sign_in(&self) -> Result<Identity> {
        let identity = self.provider.sign_in().await?;
        self.state.send_modify(|state| {
            state.identity = Some(identity.clone());
            state.is_loading = false;
        });
        Ok(identity)
    }

    /// End the session. The local identity is cleared once the provider call
    /// returns, whether or not it succeeded; its error is still reported.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.provider.sign_out().await;
        self.state.send_modify(|state| state.identity = None);
        info!("Signed out");
        result
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
