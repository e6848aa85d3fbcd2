pub mod bookmark;
pub mod event;
pub mod identity;

pub use bookmark::{Bookmark, BookmarkId, NewBookmark};
pub use event::ChangeEvent;
pub use identity::{Identity, UserId};
