pub mod app;
pub mod event;
pub mod layout;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

use crate::app::{AppContext, Result};
use crate::feed::FeedHandle;
use crate::form::SubmitOutcome;

use self::app::{ActivePane, TuiApp};
use self::event::{Action, AppEvent, EventHandler, UiMessage};

type Tui = Terminal<CrosstermBackend<Stdout>>;

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, ctx).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(terminal: &mut Tui, ctx: Arc<AppContext>) -> Result<()> {
    let keymap = ctx.config.keybindings.keymap();
    let colors = ctx.config.colors.clone();
    let event_handler = EventHandler::new(Duration::from_millis(100));
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();

    let mut session_rx = ctx.session.subscribe();
    let mut tui_app = TuiApp::new(session_rx.borrow_and_update().clone());
    let mut feed: Option<FeedHandle> = None;

    let session = ctx.session.clone();
    tokio::spawn(async move { session.init().await });

    loop {
        if session_rx.has_changed().unwrap_or(false) {
            tui_app.session = session_rx.borrow_and_update().clone();
            sync_feed(&mut feed, &ctx);
        }
        tui_app.set_feed(feed.as_ref().map(FeedHandle::state));

        while let Ok(message) = ui_rx.try_recv() {
            handle_message(&mut tui_app, message);
        }

        terminal.draw(|frame| layout::render(frame, &mut tui_app, &colors))?;

        match event_handler.next()? {
            AppEvent::Key(key) => {
                // Handle pending delete confirmation
                if let Some(bookmark) = tui_app.pending_delete.take() {
                    match key.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => {
                            if let Some(feed) = &feed {
                                let id = bookmark.id.clone();
                                let request = feed.delete(&id);
                                let tx = ui_tx.clone();
                                tokio::spawn(async move {
                                    let _ = tx.send(UiMessage::Deleted(id, request.await));
                                });
                                tui_app.set_status(format!("Deleting \"{}\"...", bookmark.title));
                            }
                        }
                        _ => {
                            tui_app.set_status("Delete cancelled".to_string());
                        }
                    }
                    continue;
                }

                if handle_input(&mut tui_app, &key) {
                    continue;
                }

                match keymap.action_for(&key) {
                    Action::Quit => {
                        tui_app.should_quit = true;
                    }
                    Action::MoveUp => {
                        tui_app.move_up();
                    }
                    Action::MoveDown => {
                        tui_app.move_down();
                    }
                    Action::NextPage => {
                        tui_app.next_page();
                    }
                    Action::PrevPage => {
                        tui_app.prev_page();
                    }
                    Action::NextPane => {
                        tui_app.active_pane = tui_app.active_pane.next();
                    }
                    Action::PrevPane => {
                        tui_app.active_pane = tui_app.active_pane.prev();
                    }
                    Action::Select => {
                        if tui_app.active_pane.is_input() {
                            submit(&mut tui_app, &ctx, &ui_tx);
                        } else {
                            open_selected(&mut tui_app);
                        }
                    }
                    Action::OpenInBrowser => {
                        open_selected(&mut tui_app);
                    }
                    Action::DeleteBookmark => {
                        if tui_app.active_pane == ActivePane::Bookmarks {
                            tui_app.pending_delete = tui_app.selected_bookmark().cloned();
                        }
                    }
                    Action::SignIn => {
                        if !tui_app.session.is_signed_in()
                            && !tui_app.session.is_loading
                            && !tui_app.is_signing_in
                        {
                            tui_app.is_signing_in = true;
                            tui_app.clear_status();
                            let session = ctx.session.clone();
                            let tx = ui_tx.clone();
                            tokio::spawn(async move {
                                let _ = tx.send(UiMessage::SignedIn(session.sign_in().await));
                            });
                        }
                    }
                    Action::SignOut => {
                        if tui_app.session.is_signed_in() {
                            let session = ctx.session.clone();
                            let tx = ui_tx.clone();
                            tokio::spawn(async move {
                                let _ = tx.send(UiMessage::SignedOut(session.sign_out().await));
                            });
                        }
                    }
                    Action::Reload => {
                        if feed.is_some() {
                            info!("Reloading bookmarks");
                            feed = None;
                            sync_feed(&mut feed, &ctx);
                            tui_app.clear_status();
                        }
                    }
                    Action::None => {}
                }
            }
            AppEvent::Tick => {}
        }

        if tui_app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Keep exactly one feed mounted for the current identity.
fn sync_feed(feed: &mut Option<FeedHandle>, ctx: &AppContext) {
    let wanted = ctx.session.identity().map(|identity| identity.id);
    let mounted = feed.as_ref().map(|f| f.owner().clone());
    if wanted == mounted {
        return;
    }

    // Dropping the old handle unmounts it
    *feed = None;
    *feed = ctx.mount_feed();
}

/// Text editing in the form fields. Returns true if the key was consumed.
fn handle_input(tui_app: &mut TuiApp, key: &KeyEvent) -> bool {
    if !tui_app.session.is_signed_in() || !tui_app.active_pane.is_input() {
        return false;
    }

    match key.code {
        KeyCode::Esc => {
            tui_app.active_pane = ActivePane::Bookmarks;
            true
        }
        KeyCode::Backspace => {
            if let Some(field) = tui_app.active_field() {
                field.pop();
            }
            true
        }
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            if let Some(field) = tui_app.active_field() {
                field.push(c);
            }
            true
        }
        _ => false,
    }
}

fn submit(tui_app: &mut TuiApp, ctx: &AppContext, ui_tx: &UnboundedSender<UiMessage>) {
    match tui_app.form.begin(tui_app.session.identity.as_ref()) {
        Ok(new_bookmark) => {
            let store = ctx.store.clone();
            let tx = ui_tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(UiMessage::Submitted(store.insert(&new_bookmark).await));
            });
            tui_app.clear_status();
        }
        Err(SubmitOutcome::Invalid(e)) => tui_app.set_error(e.to_string()),
        Err(_) => {}
    }
}

fn open_selected(tui_app: &mut TuiApp) {
    if let Some(bookmark) = tui_app.selected_bookmark() {
        if let Err(e) = open::that(&bookmark.url) {
            tui_app.set_error(format!("Failed to open browser: {}", e));
        }
    }
}

fn handle_message(tui_app: &mut TuiApp, message: UiMessage) {
    match message {
        UiMessage::Submitted(result) => {
            tui_app.form.finish(&result);
            match result {
                Ok(bookmark) => tui_app.set_status(format!("Added \"{}\"", bookmark.title)),
                Err(e) => tui_app.set_error(format!("Could not add bookmark: {}", e)),
            }
        }
        UiMessage::Deleted(id, result) => match result {
            Ok(()) => tui_app.clear_status(),
            Err(e) => {
                warn!("Delete of {} failed", id);
                tui_app.set_error(format!("Could not delete bookmark: {}", e));
            }
        },
        UiMessage::SignedIn(result) => {
            tui_app.is_signing_in = false;
            match result {
                Ok(identity) => {
                    tui_app.active_pane = ActivePane::Title;
                    tui_app.set_status(format!("Signed in as {}", identity.display_name()));
                }
                Err(e) => tui_app.set_error(format!("Sign-in failed: {}", e)),
            }
        }
        UiMessage::SignedOut(result) => {
            tui_app.form = Default::default();
            match result {
                Ok(()) => tui_app.set_status("Signed out".to_string()),
                Err(e) => tui_app.set_error(format!("Signed out locally; server said: {}", e)),
            }
        }
    }
}
