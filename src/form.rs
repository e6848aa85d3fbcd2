//! Bookmark submission form.
//!
//! Submission is split into [`BookmarkForm::begin`] and
//! [`BookmarkForm::finish`] so a UI can run the create request in the
//! background while the form stays locked; [`BookmarkForm::submit`] does
//! both in one call.

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::app::Result;
use crate::backend::BookmarkStore;
use crate::domain::{Bookmark, Identity, NewBookmark};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("URL is required")]
    EmptyUrl,

    #[error("Not a valid absolute URL: {0}")]
    InvalidUrl(String),
}

/// What happened to a submit attempt that did not reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Bookmark),
    /// No identity; nothing was sent.
    SignedOut,
    /// A previous request is still in flight.
    InFlight,
    Invalid(ValidationError),
}

#[derive(Debug, Default, Clone)]
pub struct BookmarkForm {
    pub title: String,
    pub url: String,
    submitting: bool,
}

impl BookmarkForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// The submit control is disabled while this is true.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Validate the fields and lock the form.
    ///
    /// `Ok` carries the row to insert; `Err` carries the reason nothing should
    /// be sent. On `Ok` the caller must report the store's answer to
    /// [`finish`](Self::finish).
    pub fn begin(
        &mut self,
        identity: Option<&Identity>,
    ) -> std::result::Result<NewBookmark, SubmitOutcome> {
        let Some(identity) = identity else {
            return Err(SubmitOutcome::SignedOut);
        };
        if self.submitting {
            return Err(SubmitOutcome::InFlight);
        }

        let title = self.title.trim();
        let url = self.url.trim();
        if title.is_empty() {
            return Err(SubmitOutcome::Invalid(ValidationError::EmptyTitle));
        }
        if url.is_empty() {
            return Err(SubmitOutcome::Invalid(ValidationError::EmptyUrl));
        }
        if Url::parse(url).is_err() {
            return Err(SubmitOutcome::Invalid(ValidationError::InvalidUrl(
                url.to_string(),
            )));
        }

        self.submitting = true;
        Ok(NewBookmark {
            url: url.to_string(),
            title: title.to_string(),
            user_id: identity.id.clone(),
        })
    }

    /// Unlock the form. Fields are cleared only if the create succeeded.
    pub fn finish(&mut self, result: &Result<Bookmark>) {
        self.submitting = false;
        match result {
            Ok(bookmark) => {
                debug!("Created bookmark {}", bookmark.id);
                self.title.clear();
                self.url.clear();
            }
            Err(e) => warn!("Error adding bookmark: {}", e),
        }
    }

    /// Validate, send one create request, and settle the form.
    pub async fn submit<S>(&mut self, identity: Option<&Identity>, store: &S) -> Result<SubmitOutcome>
    where
        S: BookmarkStore + ?Sized,
    {
        let new_bookmark = match self.begin(identity) {
            Ok(new_bookmark) => new_bookmark,
            Err(outcome) => return Ok(outcome),
        };

        let result = store.insert(&new_bookmark).await;
        self.finish(&result);
        result.map(SubmitOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::domain::UserId;
    use tokio_test::{assert_err, assert_ok};

    fn ada() -> Identity {
        Identity::new("ada")
    }

    fn filled(title: &str, url: &str) -> BookmarkForm {
        BookmarkForm {
            title: title.to_string(),
            url: url.to_string(),
            ..BookmarkForm::default()
        }
    }

    #[tokio::test]
    async fn test_valid_submit_creates_one_row_and_clears_fields() {
        let store = MemoryBackend::new();
        let mut form = filled("  Docs ", " https://example.com/docs ");

        let outcome = assert_ok!(form.submit(Some(&ada()), &store).await);

        let SubmitOutcome::Created(row) = outcome else {
            panic!("expected a created row, got {:?}", outcome);
        };
        assert_eq!(row.title, "Docs");
        assert_eq!(row.url, "https://example.com/docs");
        assert_eq!(row.user_id, UserId::from("ada"));
        assert_eq!(store.insert_calls(), 1);
        assert!(form.title.is_empty() && form.url.is_empty());
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_blank_fields_never_reach_the_store() {
        let store = MemoryBackend::new();
        let cases = [
            ("", "https://example.com", ValidationError::EmptyTitle),
            ("   ", "https://example.com", ValidationError::EmptyTitle),
            ("Docs", "", ValidationError::EmptyUrl),
            ("Docs", " \t ", ValidationError::EmptyUrl),
        ];

        for (title, url, expected) in cases {
            let mut form = filled(title, url);
            let outcome = form.submit(Some(&ada()), &store).await.unwrap();
            assert_eq!(outcome, SubmitOutcome::Invalid(expected));
            assert_eq!(form.title, title);
            assert_eq!(form.url, url);
        }
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_url_is_rejected() {
        let store = MemoryBackend::new();
        let mut form = filled("Docs", "example.com/docs");
        let outcome = form.submit(Some(&ada()), &store).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Invalid(ValidationError::InvalidUrl(_))
        ));
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_identity_is_a_silent_guard() {
        let store = MemoryBackend::new();
        let mut form = filled("Docs", "https://example.com/docs");
        let outcome = form.submit(None, &store).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::SignedOut);
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_input() {
        let store = MemoryBackend::new();
        store.set_write_failure(Some("network unreachable"));
        let mut form = filled("Docs", "https://example.com/docs");

        assert_err!(form.submit(Some(&ada()), &store).await);
        assert_eq!(form.title, "Docs");
        assert_eq!(form.url, "https://example.com/docs");
        assert!(!form.is_submitting());
        assert_eq!(store.insert_calls(), 1);
    }

    #[test]
    fn test_second_submit_while_in_flight_is_refused() {
        let mut form = filled("Docs", "https://example.com/docs");
        assert!(form.begin(Some(&ada())).is_ok());
        assert!(form.is_submitting());
        assert_eq!(form.begin(Some(&ada())), Err(SubmitOutcome::InFlight));

        form.finish(&Err(crate::app::SmartmarksError::Other("boom".into())));
        assert!(!form.is_submitting());
        assert!(form.begin(Some(&ada())).is_ok());
    }
}
