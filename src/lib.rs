//! # SmartMarks
//!
//! A personal bookmark manager whose list stays in sync across every place
//! you are signed in.
//!
//! ## Architecture
//!
//! ```text
//! AuthProvider → SessionContext ─┬─→ BookmarkForm ──insert──→ BookmarkStore
//!                                └─→ FeedHandle ◄──events─── ChangeChannel
//! ```
//!
//! The form and the feed never talk to each other. A new bookmark reaches the
//! feed the same way a bookmark added on another device does: through the
//! change channel.
//!
//! ## Quick Start
//!
//! ```bash
//! # Sign in through the browser
//! smartmarks login
//!
//! # Add and list bookmarks
//! smartmarks add https://doc.rust-lang.org/book/ --title "The Book"
//! smartmarks list
//!
//! # Launch the TUI
//! smartmarks
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires the auth provider, store and change
/// channel together and owns the [`SessionContext`](session::SessionContext).
pub mod app;

/// Sign-in against the hosted auth service.
///
/// - [`AuthProvider`](auth::AuthProvider): async trait the session talks to
/// - [`GoTrueAuth`](auth::GoTrueAuth): browser redirect with PKCE and a local callback
/// - [`SessionFile`](auth::SessionFile): persisted tokens
pub mod auth;

/// Bookmark storage and change notification.
///
/// - [`BookmarkStore`](backend::BookmarkStore) / [`ChangeChannel`](backend::ChangeChannel): the seams
/// - [`RestStore`](backend::RestStore): hosted data API
/// - [`PollingChannel`](backend::PollingChannel): change events from snapshot diffs
/// - [`MemoryBackend`](backend::MemoryBackend): in-process store and channel
pub mod backend;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/smartmarks/config.toml`: backend settings, colors,
/// keybindings.
pub mod config;

/// Core domain models: [`Identity`](domain::Identity),
/// [`Bookmark`](domain::Bookmark), [`ChangeEvent`](domain::ChangeEvent).
pub mod domain;

/// The live bookmark list and its reconciliation rules.
pub mod feed;

/// Bookmark submission form.
pub mod form;

/// Identity session holder.
pub mod session;

/// Terminal user interface.
///
/// Navigation bar on top; below it the landing view when signed out, or the
/// form beside the bookmark list when signed in.
///
/// Keybindings: Tab cycles panes, Enter adds (form) or opens (list),
/// d deletes, R reloads, l/L sign in/out, q quits.
pub mod tui;
