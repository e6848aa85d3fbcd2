use crate::app::{AppContext, Result, SmartmarksError};
use crate::domain::{BookmarkId, Identity};
use crate::form::{BookmarkForm, SubmitOutcome};

/// Restore the saved session and return its identity.
async fn require_identity(ctx: &AppContext) -> Result<Identity> {
    ctx.session.init().await;
    ctx.session.identity().ok_or(SmartmarksError::NotSignedIn)
}

pub async fn login(ctx: &AppContext) -> Result<()> {
    ctx.session.init().await;
    if let Some(identity) = ctx.session.identity() {
        println!("Already signed in as {}", identity.display_name());
        return Ok(());
    }

    println!("Opening the browser to sign in...");
    let identity = ctx.session.sign_in().await?;
    println!("Signed in as {}", identity.display_name());
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    ctx.session.init().await;
    if !ctx.session.state().is_signed_in() {
        println!("Not signed in");
        return Ok(());
    }

    ctx.session.sign_out().await?;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    ctx.session.init().await;
    match ctx.session.identity() {
        Some(identity) => {
            println!("{}", identity.display_name());
            if let Some(email) = &identity.email {
                println!("  {}", email);
            }
            println!("  id: {}", identity.id);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn add_bookmark(ctx: &AppContext, url: &str, title: &str) -> Result<()> {
    let identity = require_identity(ctx).await?;

    let mut form = BookmarkForm::new();
    form.title = title.to_string();
    form.url = url.to_string();

    match form.submit(Some(&identity), ctx.store.as_ref()).await? {
        SubmitOutcome::Created(bookmark) => {
            println!("Added: {}", bookmark.title);
            println!("  {}", bookmark.url);
            println!("  id: {}", bookmark.id);
            Ok(())
        }
        SubmitOutcome::Invalid(e) => Err(e.into()),
        SubmitOutcome::SignedOut => Err(SmartmarksError::NotSignedIn),
        SubmitOutcome::InFlight => Ok(()),
    }
}

pub async fn list_bookmarks(ctx: &AppContext) -> Result<()> {
    let identity = require_identity(ctx).await?;
    let bookmarks = ctx.store.list(&identity.id).await?;

    if bookmarks.is_empty() {
        println!("No bookmarks yet");
        return Ok(());
    }

    for bookmark in bookmarks {
        println!(
            "{} {}\n  {}\n  id: {}",
            bookmark.created_at.format("%Y-%m-%d"),
            bookmark.title,
            bookmark.url,
            bookmark.id
        );
    }

    Ok(())
}

pub async fn remove_bookmark(ctx: &AppContext, id: &str) -> Result<()> {
    let identity = require_identity(ctx).await?;
    ctx.store.delete(&identity.id, &BookmarkId::from(id)).await?;
    println!("Removed bookmark: {}", id);
    Ok(())
}
