use crate::domain::{Bookmark, BookmarkId, ChangeEvent};

/// The feed's in-memory rows: newest first, at most one entry per id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedList {
    entries: Vec<Bookmark>,
}

impl FeedList {
    /// Build from a fetch result. Rows are sorted by `created_at`, newest
    /// first, and repeated ids keep only their first occurrence.
    pub fn from_rows(mut rows: Vec<Bookmark>) -> Self {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut list = Self {
            entries: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            if !list.contains(&row.id) {
                list.entries.push(row);
            }
        }
        list
    }

    /// Merge one change event. Returns whether the list changed.
    ///
    /// A create for a known id and a delete for an unknown id are both no-ops.
    /// Creates are prepended without re-sorting.
    pub fn apply(&mut self, event: ChangeEvent) -> bool {
        match event {
            ChangeEvent::Created(bookmark) => {
                if self.contains(&bookmark.id) {
                    return false;
                }
                self.entries.insert(0, bookmark);
                true
            }
            ChangeEvent::Deleted { id } => {
                let before = self.entries.len();
                self.entries.retain(|b| b.id != id);
                self.entries.len() != before
            }
        }
    }

    pub fn contains(&self, id: &BookmarkId) -> bool {
        self.entries.iter().any(|b| &b.id == id)
    }

    pub fn entries(&self) -> &[Bookmark] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Bookmark> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn row(id: &str, minute: u32) -> Bookmark {
        Bookmark {
            id: BookmarkId::from(id),
            url: format!("https://example.com/{}", id),
            title: format!("Bookmark {}", id),
            user_id: UserId::from("u1"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap(),
        }
    }

    fn ids(list: &FeedList) -> Vec<&str> {
        list.entries().iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_from_rows_sorts_newest_first() {
        let list = FeedList::from_rows(vec![row("1", 1), row("3", 3), row("2", 2)]);
        assert_eq!(ids(&list), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_from_rows_drops_repeated_ids() {
        let list = FeedList::from_rows(vec![row("1", 1), row("1", 1), row("2", 2)]);
        assert_eq!(ids(&list), vec!["2", "1"]);
    }

    #[test]
    fn test_create_prepends() {
        let mut list = FeedList::from_rows(vec![row("1", 1)]);
        assert!(list.apply(ChangeEvent::Created(row("2", 2))));
        assert_eq!(ids(&list), vec!["2", "1"]);
    }

    #[test]
    fn test_duplicate_create_leaves_list_unchanged() {
        let mut list = FeedList::from_rows(vec![row("2", 2), row("1", 1)]);
        let before = list.clone();

        assert!(!list.apply(ChangeEvent::Created(row("1", 1))));
        assert_eq!(list, before);
    }

    #[test]
    fn test_delete_removes_matching_entry() {
        let mut list = FeedList::from_rows(vec![row("1", 2), row("2", 1)]);
        assert!(list.apply(ChangeEvent::Deleted {
            id: BookmarkId::from("1")
        }));
        assert_eq!(list.entries(), &[row("2", 1)]);
    }

    #[test]
    fn test_delete_of_unknown_id_is_a_no_op() {
        let mut list = FeedList::from_rows(vec![row("1", 1)]);
        assert!(!list.apply(ChangeEvent::Deleted {
            id: BookmarkId::from("9")
        }));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_out_of_order_creates_are_not_resorted() {
        let mut list = FeedList::from_rows(vec![row("1", 1)]);
        list.apply(ChangeEvent::Created(row("3", 3)));
        list.apply(ChangeEvent::Created(row("2", 2)));
        assert_eq!(ids(&list), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_event_sequences_leave_live_ids_without_duplicates() {
        // Deterministic pseudo-random sequences over a small id space so that
        // duplicates and deletes of missing ids are common.
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as u32
        };

        for _ in 0..200 {
            let mut list = FeedList::default();
            let mut live = BTreeSet::new();

            for _ in 0..40 {
                let id = (next() % 6).to_string();
                if next() % 3 == 0 {
                    list.apply(ChangeEvent::Deleted {
                        id: BookmarkId(id.clone()),
                    });
                    live.remove(&id);
                } else {
                    list.apply(ChangeEvent::Created(row(&id, next() % 60)));
                    live.insert(id);
                }
            }

            let listed: Vec<String> = list.entries().iter().map(|b| b.id.0.clone()).collect();
            let unique: BTreeSet<String> = listed.iter().cloned().collect();
            assert_eq!(listed.len(), unique.len(), "duplicate ids in {:?}", listed);
            assert_eq!(unique, live);
        }
    }
}
