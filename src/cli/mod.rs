pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "smartmarks")]
#[command(about = "Personal bookmarks that stay in sync", long_about = None)]
pub struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Sign in through the browser
    Login,
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Add a bookmark
    Add {
        /// URL to bookmark
        url: String,
        /// Title shown in the list
        #[arg(short, long)]
        title: String,
    },
    /// List bookmarks, newest first
    List,
    /// Remove a bookmark by id
    Remove {
        /// Id of the bookmark, as shown by `list`
        id: String,
    },
    /// Launch the TUI (default)
    Tui,
}
