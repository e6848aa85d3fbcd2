//! Change channel derived from periodic re-reads of the store.
//!
//! Each subscription owns a task that lists the owner's rows on an interval
//! and diffs consecutive snapshots into [`ChangeEvent`]s.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::app::Result;
use crate::backend::{BookmarkStore, ChangeChannel, Subscription};
use crate::domain::{Bookmark, ChangeEvent, UserId};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

pub struct PollingChannel {
    store: Arc<dyn BookmarkStore + Send + Sync>,
    period: Duration,
}

impl PollingChannel {
    pub fn new(store: Arc<dyn BookmarkStore + Send + Sync>) -> Self {
        Self::with_interval(store, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(store: Arc<dyn BookmarkStore + Send + Sync>, period: Duration) -> Self {
        Self { store, period }
    }
}

#[async_trait]
impl ChangeChannel for PollingChannel {
    /// The baseline snapshot is read before this returns, so any change made
    /// after `subscribe` resolves is reported. A failed baseline read leaves
    /// the baseline empty and every row is announced on the first good poll.
    async fn subscribe(&self, owner: &UserId) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = self.store.clone();
        let owner = owner.clone();
        let period = self.period;

        let mut previous = match store.list(&owner).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Baseline read for {} failed: {}", owner, e);
                Vec::new()
            }
        };

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let current = match store.list(&owner).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!("Polling bookmarks for {} failed: {}", owner, e);
                        continue;
                    }
                };

                for event in diff_snapshots(&previous, &current) {
                    if tx.send(event).is_err() {
                        debug!("Subscription for {} closed", owner);
                        return;
                    }
                }
                previous = current;
            }
        });

        Ok(Subscription::with_task(rx, task))
    }
}

/// Events that turn `previous` into `current`.
///
/// Deletions come first. Creations are emitted oldest first so that a
/// consumer prepending each one ends up newest-first.
pub fn diff_snapshots(previous: &[Bookmark], current: &[Bookmark]) -> Vec<ChangeEvent> {
    let previous_ids: HashSet<_> = previous.iter().map(|b| &b.id).collect();
    let current_ids: HashSet<_> = current.iter().map(|b| &b.id).collect();

    let mut events: Vec<ChangeEvent> = previous
        .iter()
        .filter(|b| !current_ids.contains(&b.id))
        .map(|b| ChangeEvent::Deleted { id: b.id.clone() })
        .collect();

    let mut created: Vec<&Bookmark> = current
        .iter()
        .filter(|b| !previous_ids.contains(&b.id))
        .collect();
    created.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    events.extend(created.into_iter().cloned().map(ChangeEvent::Created));

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::domain::{BookmarkId, NewBookmark};
    use chrono::{TimeZone, Utc};

    fn row(id: &str, minute: u32) -> Bookmark {
        Bookmark {
            id: BookmarkId::from(id),
            url: format!("https://example.com/{}", id),
            title: id.to_string(),
            user_id: UserId::from("u1"),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_diff_identical_snapshots_is_empty() {
        let rows = vec![row("b", 2), row("a", 1)];
        assert!(diff_snapshots(&rows, &rows).is_empty());
    }

    #[test]
    fn test_diff_reports_deletions_then_creations_oldest_first() {
        let previous = vec![row("b", 2), row("a", 1)];
        let current = vec![row("d", 4), row("c", 3), row("b", 2)];

        let events = diff_snapshots(&previous, &current);
        assert_eq!(
            events,
            vec![
                ChangeEvent::Deleted {
                    id: BookmarkId::from("a")
                },
                ChangeEvent::Created(row("c", 3)),
                ChangeEvent::Created(row("d", 4)),
            ]
        );
    }

    #[tokio::test]
    async fn test_polling_subscription_reports_new_rows() {
        let backend = Arc::new(MemoryBackend::new());
        let channel = PollingChannel::with_interval(backend.clone(), Duration::from_millis(10));
        let owner = UserId::from("u1");

        let mut sub = channel.subscribe(&owner).await.unwrap();

        let created = backend
            .insert(&NewBookmark {
                url: "https://example.com/docs".into(),
                title: "Docs".into(),
                user_id: owner.clone(),
            })
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("poll should report the insert");
        assert_eq!(event, Some(ChangeEvent::Created(created)));
    }

    #[tokio::test]
    async fn test_failed_baseline_announces_existing_rows() {
        let backend = Arc::new(MemoryBackend::new());
        let channel = PollingChannel::with_interval(backend.clone(), Duration::from_millis(10));
        let owner = UserId::from("u1");
        let existing = backend
            .insert(&NewBookmark {
                url: "https://example.com/old".into(),
                title: "Old".into(),
                user_id: owner.clone(),
            })
            .await
            .unwrap();

        backend.set_read_failure(Some("network unreachable"));
        let mut sub = channel.subscribe(&owner).await.unwrap();
        backend.set_read_failure(None);

        let event = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("first good poll should report the row");
        assert_eq!(event, Some(ChangeEvent::Created(existing)));
    }
}
