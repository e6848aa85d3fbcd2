//! Identity provider integration.
//!
//! [`AuthProvider`] is the seam the session context talks to;
//! [`GoTrueAuth`] implements it against the hosted auth service with a
//! browser redirect and a local callback listener.

pub mod callback;
pub mod gotrue;
pub mod pkce;
pub mod session_file;

use std::sync::RwLock;

use async_trait::async_trait;

use crate::app::{Result, SmartmarksError};
use crate::domain::Identity;

pub use gotrue::GoTrueAuth;
pub use session_file::{SessionFile, StoredSession};

#[async_trait]
pub trait AuthProvider {
    /// Reload a persisted session, if there is one that is still valid.
    async fn restore(&self) -> Result<Option<Identity>>;

    /// Run the interactive sign-in flow to completion.
    async fn sign_in(&self) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;
}

/// Supplies the bearer token sent with data requests.
#[async_trait]
pub trait BearerSource {
    /// A token that is not about to expire, or [`SmartmarksError::NotSignedIn`].
    async fn bearer(&self) -> Result<String>;
}

/// Tokens of the signed-in user, written by the auth provider.
#[derive(Debug, Default)]
pub struct AccessToken(RwLock<Option<StoredSession>>);

impl AccessToken {
    pub fn get(&self) -> Option<String> {
        self.session().map(|session| session.access_token)
    }

    pub fn session(&self) -> Option<StoredSession> {
        self.0.read().ok().and_then(|session| session.clone())
    }

    pub fn set(&self, session: Option<StoredSession>) {
        if let Ok(mut guard) = self.0.write() {
            *guard = session;
        }
    }
}

/// Hands out whatever token is held, without renewing it.
#[async_trait]
impl BearerSource for AccessToken {
    async fn bearer(&self) -> Result<String> {
        self.get().ok_or(SmartmarksError::NotSignedIn)
    }
}

/// Provider with a fixed identity and no remote side.
pub struct StaticAuth {
    identity: Option<Identity>,
}

impl StaticAuth {
    pub fn new(identity: Option<Identity>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn restore(&self) -> Result<Option<Identity>> {
        Ok(self.identity.clone())
    }

    async fn sign_in(&self) -> Result<Identity> {
        self.identity
            .clone()
            .ok_or_else(|| SmartmarksError::Auth("No identity configured".to_string()))
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}
