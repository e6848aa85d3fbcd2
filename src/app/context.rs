use std::sync::Arc;

use crate::app::error::Result;
use crate::auth::{AuthProvider, GoTrueAuth, SessionFile, StaticAuth};
use crate::backend::{BookmarkStore, ChangeChannel, MemoryBackend, PollingChannel, RestStore};
use crate::config::Config;
use crate::domain::Identity;
use crate::feed::FeedHandle;
use crate::session::SessionContext;

pub struct AppContext {
    pub config: Arc<Config>,
    pub session: Arc<SessionContext>,
    pub store: Arc<dyn BookmarkStore + Send + Sync>,
    pub channel: Arc<dyn ChangeChannel + Send + Sync>,
}

impl AppContext {
    /// Wire the hosted backend from `config`. The session starts in the
    /// loading state; call [`SessionContext::init`] to restore it.
    pub fn new(config: Config) -> Result<Self> {
        config.backend.validate()?;

        let session_file = SessionFile::new(SessionFile::default_path()?);
        let gotrue = Arc::new(GoTrueAuth::new(&config.backend, session_file)?);
        let store: Arc<dyn BookmarkStore + Send + Sync> =
            Arc::new(RestStore::new(&config.backend, gotrue.clone())?);
        let auth: Arc<dyn AuthProvider + Send + Sync> = gotrue;
        let channel: Arc<dyn ChangeChannel + Send + Sync> = Arc::new(PollingChannel::with_interval(
            store.clone(),
            config.backend.poll_interval(),
        ));

        Ok(Self {
            config: Arc::new(config),
            session: Arc::new(SessionContext::new(auth)),
            store,
            channel,
        })
    }

    /// Everything in process: a [`MemoryBackend`] and a fixed identity.
    pub fn in_memory(identity: Option<Identity>) -> Self {
        let backend = Arc::new(MemoryBackend::new());

        Self {
            config: Arc::new(Config::default()),
            session: Arc::new(SessionContext::new(Arc::new(StaticAuth::new(identity)))),
            store: backend.clone(),
            channel: backend,
        }
    }

    /// Mount a feed for the current identity, if there is one.
    pub fn mount_feed(&self) -> Option<FeedHandle> {
        let identity = self.session.identity()?;
        Some(FeedHandle::mount(
            identity.id,
            self.store.clone(),
            self.channel.clone(),
        ))
    }
}
