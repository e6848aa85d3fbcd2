//! In-process backend: a bookmark store and change channel in one.
//!
//! Mirrors the hosted service closely enough to run the application logic
//! without a network: ids and timestamps are assigned on insert, rows are
//! scoped to their owner, and every write is fanned out to the owner's
//! subscribers.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::app::{Result, SmartmarksError};
use crate::backend::{BookmarkStore, ChangeChannel, Subscription};
use crate::domain::{Bookmark, BookmarkId, ChangeEvent, NewBookmark, UserId};

#[derive(Default)]
struct Inner {
    rows: Vec<Bookmark>,
    subscribers: Vec<(UserId, mpsc::UnboundedSender<ChangeEvent>)>,
    read_failure: Option<String>,
    write_failure: Option<String>,
    insert_calls: usize,
    last_created: Option<DateTime<Utc>>,
}

impl Inner {
    /// Insert timestamps strictly increase, so newest-first order is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created = Some(now);
        now
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `list` fail with `message` (or succeed again on `None`).
    pub fn set_read_failure(&self, message: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.read_failure = message.map(String::from);
        }
    }

    /// Make every subsequent `insert`/`delete` fail with `message`.
    pub fn set_write_failure(&self, message: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.write_failure = message.map(String::from);
        }
    }

    /// Number of insert requests received, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.inner.lock().map(|inner| inner.insert_calls).unwrap_or(0)
    }

    /// Number of listeners that are still open.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .map(|mut inner| {
                inner.subscribers.retain(|(_, tx)| !tx.is_closed());
                inner.subscribers.len()
            })
            .unwrap_or(0)
    }

    /// Push an event to `owner`'s subscribers without touching the rows.
    ///
    /// Stands in for the service redelivering or reordering notifications.
    pub fn emit(&self, owner: &UserId, event: ChangeEvent) {
        if let Ok(mut inner) = self.inner.lock() {
            Self::broadcast(&mut inner, owner, event);
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| SmartmarksError::Other(format!("memory backend poisoned: {}", e)))
    }

    fn broadcast(inner: &mut Inner, owner: &UserId, event: ChangeEvent) {
        inner.subscribers.retain(|(subscriber, tx)| {
            if subscriber != owner {
                return !tx.is_closed();
            }
            tx.send(event.clone()).is_ok()
        });
    }

    fn unavailable(message: &str) -> SmartmarksError {
        SmartmarksError::Api {
            status: 503,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl BookmarkStore for MemoryBackend {
    async fn list(&self, owner: &UserId) -> Result<Vec<Bookmark>> {
        let inner = self.lock()?;
        if let Some(message) = &inner.read_failure {
            return Err(Self::unavailable(message));
        }

        let mut rows: Vec<Bookmark> = inner
            .rows
            .iter()
            .filter(|row| &row.user_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, bookmark: &NewBookmark) -> Result<Bookmark> {
        let mut inner = self.lock()?;
        inner.insert_calls += 1;
        if let Some(message) = &inner.write_failure {
            return Err(Self::unavailable(message));
        }

        let row = Bookmark {
            id: BookmarkId(Uuid::new_v4().to_string()),
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            user_id: bookmark.user_id.clone(),
            created_at: inner.next_timestamp(),
        };
        inner.rows.push(row.clone());
        debug!("memory backend: inserted {}", row.id);

        Self::broadcast(&mut inner, &row.user_id, ChangeEvent::Created(row.clone()));
        Ok(row)
    }

    async fn delete(&self, owner: &UserId, id: &BookmarkId) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(message) = &inner.write_failure {
            return Err(Self::unavailable(message));
        }

        let before = inner.rows.len();
        inner
            .rows
            .retain(|row| !(&row.id == id && &row.user_id == owner));

        // Deleting someone else's (or a missing) row matches nothing and is not an error.
        if inner.rows.len() < before {
            debug!("memory backend: deleted {}", id);
            Self::broadcast(&mut inner, owner, ChangeEvent::Deleted { id: id.clone() });
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeChannel for MemoryBackend {
    async fn subscribe(&self, owner: &UserId) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock()?.subscribers.push((owner.clone(), tx));
        Ok(Subscription::new(rx))
    }
}
