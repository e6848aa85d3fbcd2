pub mod memory;
pub mod polling;
pub mod rest;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::Result;
use crate::domain::{Bookmark, BookmarkId, ChangeEvent, NewBookmark, UserId};

pub use memory::MemoryBackend;
pub use polling::PollingChannel;
pub use rest::RestStore;

/// Data store holding the bookmarks collection.
///
/// Implementations must only ever return or remove rows owned by `owner`.
#[async_trait]
pub trait BookmarkStore {
    /// All of `owner`'s bookmarks, newest first.
    async fn list(&self, owner: &UserId) -> Result<Vec<Bookmark>>;

    /// Insert a row; the store assigns `id` and `created_at`.
    async fn insert(&self, bookmark: &NewBookmark) -> Result<Bookmark>;

    async fn delete(&self, owner: &UserId, id: &BookmarkId) -> Result<()>;
}

/// Push subscription for changes to one owner's rows.
#[async_trait]
pub trait ChangeChannel {
    async fn subscribe(&self, owner: &UserId) -> Result<Subscription>;
}

/// Live listener returned by [`ChangeChannel::subscribe`].
///
/// Dropping it releases the listener and stops any task feeding it.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { rx, task: None }
    }

    /// Subscription whose events are produced by a background task.
    pub fn with_task(rx: mpsc::UnboundedReceiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Next event, or `None` once the channel has closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
