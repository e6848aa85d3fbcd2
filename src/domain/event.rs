use super::bookmark::{Bookmark, BookmarkId};

/// A change reported by the change channel for the bookmarks collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(Bookmark),
    Deleted { id: BookmarkId },
}
