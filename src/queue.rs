//! Candidate Queue
//!
//! Cursor over one server page of recommendations at a time. The queue never
//! fetches on its own: `advance()` reports when the next page is needed and the
//! caller decides when to call `load_page()`.

use crate::api::MatchApi;
use crate::credentials::{usable_token, CredentialProvider};
use crate::error::{ApiError, FeedError};
use crate::models::{Candidate, Page, FIRST_PAGE};
use log::{debug, info, warn};
use std::sync::Arc;

/// Result of moving past the current candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The cursor moved to the next candidate of the loaded page
    StayedOnPage,
    /// The loaded page is used up; the caller must load this page next
    NeedsFetch(u32),
}

pub struct CandidateQueue {
    api: Arc<dyn MatchApi>,
    credentials: Arc<dyn CredentialProvider>,
    page_size: u32,
    buffer: Vec<Candidate>,
    cursor: usize,
    page: u32,
    /// Page requested by `advance()` and not yet loaded
    pending_page: Option<u32>,
    loaded: bool,
}

impl CandidateQueue {
    pub fn new(
        api: Arc<dyn MatchApi>,
        credentials: Arc<dyn CredentialProvider>,
        page_size: u32,
    ) -> Self {
        Self {
            api,
            credentials,
            page_size: page_size.max(1),
            buffer: Vec::new(),
            cursor: 0,
            page: FIRST_PAGE,
            pending_page: None,
            loaded: false,
        }
    }

    /// Candidate at the cursor, if any. Never fetches.
    pub fn current_candidate(&self) -> Option<&Candidate> {
        self.buffer.get(self.cursor)
    }

    /// Replace the buffer with `page_number`. On failure nothing changes.
    pub async fn load_page(&mut self, page_number: u32) -> Result<(), FeedError> {
        let token = usable_token(self.credentials.as_ref())
            .await
            .ok_or(FeedError::MissingCredential)?;

        let page = Page {
            number: page_number,
            size: self.page_size,
        };

        let candidates = match self.api.fetch_recommendations(&token, page).await {
            Ok(candidates) => candidates,
            Err(ApiError::InvalidCredential) => return Err(FeedError::MissingCredential),
            Err(source) => {
                warn!("Failed to fetch recommendations page {page_number}: {source}");
                return Err(FeedError::Fetch {
                    page: page_number,
                    source,
                });
            }
        };

        info!(
            "Loaded {} candidates for page {page_number} (page size {})",
            candidates.len(),
            self.page_size
        );

        self.buffer = candidates;
        self.cursor = 0;
        self.page = page_number;
        self.pending_page = None;
        self.loaded = true;
        Ok(())
    }

    /// Move to the next candidate, or report the page that must be loaded.
    ///
    /// While a fetch is pending, repeated calls return the same page and leave
    /// the cursor on the last candidate of the old page.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.cursor + 1 < self.buffer.len() {
            self.cursor += 1;
            debug!("Advanced to candidate {} of page {}", self.cursor, self.page);
            return AdvanceOutcome::StayedOnPage;
        }

        let next = if self.loaded {
            *self.pending_page.get_or_insert(self.page + 1)
        } else {
            *self.pending_page.get_or_insert(self.page)
        };
        debug!("Page {} exhausted, page {next} needed", self.page);
        AdvanceOutcome::NeedsFetch(next)
    }

    /// Page whose candidates are currently buffered
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn pending_page(&self) -> Option<u32> {
        self.pending_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The server returned an empty page: no more candidates for now
    pub fn is_exhausted(&self) -> bool {
        self.loaded && self.buffer.is_empty()
    }

    /// Candidates left on this page after the current one
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor + 1)
    }
}
