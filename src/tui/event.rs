use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use std::time::Duration;

use crate::app::Result;
use crate::domain::{Bookmark, BookmarkId, Identity};

pub enum AppEvent {
    Key(KeyEvent),
    Tick,
}

pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    pub fn next(&self) -> Result<AppEvent> {
        if event::poll(self.tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Windows also reports releases
                if key.kind == KeyEventKind::Press {
                    return Ok(AppEvent::Key(key));
                }
            }
        }
        Ok(AppEvent::Tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    MoveUp,
    MoveDown,
    NextPage,
    PrevPage,
    NextPane,
    PrevPane,
    Select,
    OpenInBrowser,
    DeleteBookmark,
    SignIn,
    SignOut,
    Reload,
    None,
}

/// Results of background requests started from the UI loop.
#[derive(Debug)]
pub enum UiMessage {
    Submitted(Result<Bookmark>),
    Deleted(BookmarkId, Result<()>),
    SignedIn(Result<Identity>),
    SignedOut(Result<()>),
}
