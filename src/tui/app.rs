use ratatui::widgets::ListState;

use crate::domain::Bookmark;
use crate::feed::FeedState;
use crate::form::BookmarkForm;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Title,
    Url,
    Bookmarks,
}

impl ActivePane {
    pub fn next(self) -> Self {
        match self {
            ActivePane::Title => ActivePane::Url,
            ActivePane::Url => ActivePane::Bookmarks,
            ActivePane::Bookmarks => ActivePane::Title,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActivePane::Title => ActivePane::Bookmarks,
            ActivePane::Url => ActivePane::Title,
            ActivePane::Bookmarks => ActivePane::Url,
        }
    }

    /// Form fields take typed characters.
    pub fn is_input(self) -> bool {
        matches!(self, ActivePane::Title | ActivePane::Url)
    }
}

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

pub struct TuiApp {
    pub active_pane: ActivePane,
    pub session: SessionState,
    pub form: BookmarkForm,
    /// `None` while no feed is mounted (signed out).
    pub feed: Option<FeedState>,
    pub bookmark_index: usize,
    pub bookmark_list_state: ListState,
    pub should_quit: bool,
    pub status: Option<StatusMessage>,
    pub is_signing_in: bool,
    // Pending delete confirmation
    pub pending_delete: Option<Bookmark>,
}

impl TuiApp {
    pub fn new(session: SessionState) -> Self {
        let mut bookmark_list_state = ListState::default();
        bookmark_list_state.select(Some(0));

        Self {
            active_pane: ActivePane::Title,
            session,
            form: BookmarkForm::new(),
            feed: None,
            bookmark_index: 0,
            bookmark_list_state,
            should_quit: false,
            status: None,
            is_signing_in: false,
            pending_delete: None,
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        match &self.feed {
            Some(FeedState::Ready(list)) => list.entries(),
            _ => &[],
        }
    }

    pub fn selected_bookmark(&self) -> Option<&Bookmark> {
        self.bookmarks().get(self.bookmark_index)
    }

    /// Take a new feed snapshot, keeping the selection in range.
    pub fn set_feed(&mut self, feed: Option<FeedState>) {
        self.feed = feed;
        let len = self.bookmarks().len();
        if self.bookmark_index >= len {
            self.bookmark_index = len.saturating_sub(1);
        }
        self.bookmark_list_state.select(Some(self.bookmark_index));
    }

    pub fn move_up(&mut self) {
        if self.active_pane == ActivePane::Bookmarks && self.bookmark_index > 0 {
            self.bookmark_index -= 1;
            self.bookmark_list_state.select(Some(self.bookmark_index));
        }
    }

    pub fn move_down(&mut self) {
        let len = self.bookmarks().len();
        if self.active_pane == ActivePane::Bookmarks && len > 0 && self.bookmark_index < len - 1 {
            self.bookmark_index += 1;
            self.bookmark_list_state.select(Some(self.bookmark_index));
        }
    }

    pub fn next_page(&mut self) {
        if self.active_pane != ActivePane::Bookmarks {
            return;
        }
        let max_index = self.bookmarks().len().saturating_sub(1);
        self.bookmark_index = (self.bookmark_index + PAGE_SIZE).min(max_index);
        self.bookmark_list_state.select(Some(self.bookmark_index));
    }

    pub fn prev_page(&mut self) {
        if self.active_pane != ActivePane::Bookmarks {
            return;
        }
        self.bookmark_index = self.bookmark_index.saturating_sub(PAGE_SIZE);
        self.bookmark_list_state.select(Some(self.bookmark_index));
    }

    /// The field under the cursor, if a form field has focus.
    pub fn active_field(&mut self) -> Option<&mut String> {
        match self.active_pane {
            ActivePane::Title => Some(&mut self.form.title),
            ActivePane::Url => Some(&mut self.form.url),
            ActivePane::Bookmarks => None,
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status = Some(StatusMessage {
            text: message,
            is_error: false,
        });
    }

    pub fn set_error(&mut self, message: String) {
        self.status = Some(StatusMessage {
            text: message,
            is_error: true,
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}
