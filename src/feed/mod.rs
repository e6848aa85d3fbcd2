//! Live, deduplicated, newest-first view of one identity's bookmarks.
//!
//! ```text
//! mount → Loading ─┬─ fetch ok ──→ Ready ◄── change events
//!                  └─ fetch err ─→ Error
//! unmount (any state) → Unmounted: no further writes
//! ```
//!
//! The change subscription opens before the fetch starts. Events that arrive
//! while the fetch is in flight wait in the subscription and are applied, in
//! order, once the feed is Ready.

mod list;

pub use list::FeedList;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::backend::{BookmarkStore, ChangeChannel};
use crate::domain::{BookmarkId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Loading,
    Ready(FeedList),
    /// The initial fetch failed; holds the error message.
    Error(String),
}

pub struct FeedHandle {
    owner: UserId,
    store: Arc<dyn BookmarkStore + Send + Sync>,
    state: watch::Receiver<FeedState>,
    alive: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Start loading `owner`'s bookmarks and listening for changes.
    pub fn mount(
        owner: UserId,
        store: Arc<dyn BookmarkStore + Send + Sync>,
        channel: Arc<dyn ChangeChannel + Send + Sync>,
    ) -> Self {
        let (tx, rx) = watch::channel(FeedState::Loading);
        let alive = Arc::new(AtomicBool::new(true));

        info!("Mounting feed for {}", owner);
        let task = tokio::spawn(run_feed(
            owner.clone(),
            store.clone(),
            channel,
            tx,
            alive.clone(),
        ));

        Self {
            owner,
            store,
            state: rx,
            alive,
            task: Some(task),
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Wait until the state satisfies `predicate`, or the feed stops updating.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> FeedState
    where
        F: FnMut(&FeedState) -> bool,
    {
        let reached = self
            .state
            .wait_for(|state| predicate(state))
            .await
            .map(|state| state.clone());
        match reached {
            Ok(state) => state,
            Err(_) => self.state.borrow().clone(),
        }
    }

    /// Tear down: stop the background task and release the subscription.
    pub fn unmount(&mut self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Unmounting feed for {}", self.owner);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Request deletion of one bookmark.
    ///
    /// The row is not removed locally; it disappears when the store's delete
    /// event comes back through the subscription. The returned future owns
    /// what it needs, so it can be spawned.
    pub fn delete(&self, id: &BookmarkId) -> impl Future<Output = Result<()>> + Send + 'static {
        let store = self.store.clone();
        let owner = self.owner.clone();
        let id = id.clone();

        async move {
            let result = store.delete(&owner, &id).await;
            if let Err(e) = &result {
                warn!("Error deleting bookmark {}: {}", id, e);
            }
            result
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn run_feed(
    owner: UserId,
    store: Arc<dyn BookmarkStore + Send + Sync>,
    channel: Arc<dyn ChangeChannel + Send + Sync>,
    tx: watch::Sender<FeedState>,
    alive: Arc<AtomicBool>,
) {
    let is_alive = || alive.load(Ordering::SeqCst);

    // Subscribe before fetching: once `subscribe` resolves, every later
    // change is announced, so nothing slips between the fetch and the stream.
    let subscription = channel.subscribe(&owner).await;
    if !is_alive() {
        return;
    }
    let rows = store.list(&owner).await;

    if !is_alive() {
        return;
    }

    match rows {
        Ok(rows) => {
            debug!("Fetched {} bookmarks for {}", rows.len(), owner);
            tx.send_replace(FeedState::Ready(FeedList::from_rows(rows)));
        }
        Err(e) => {
            warn!("Error fetching bookmarks: {}", e);
            tx.send_replace(FeedState::Error(e.to_string()));
            return;
        }
    }

    let mut subscription = match subscription {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Change subscription failed, feed will not update live: {}", e);
            return;
        }
    };

    while let Some(event) = subscription.recv().await {
        if !is_alive() {
            break;
        }
        tx.send_if_modified(|state| match state {
            FeedState::Ready(list) => list.apply(event),
            _ => false,
        });
    }
    debug!("Change subscription for {} closed", owner);
}
