//! Feed Session
//!
//! Owns one queue and one submitter and applies the caller contract between
//! them: a match keeps the cursor where it is, anything else advances and
//! loads the next page when the current one is used up.

use crate::api::MatchApi;
use crate::credentials::CredentialProvider;
use crate::error::FeedError;
use crate::models::{Candidate, Response, FIRST_PAGE};
use crate::queue::{AdvanceOutcome, CandidateQueue};
use crate::submitter::DecisionSubmitter;
use log::info;
use std::sync::Arc;

/// What happened to the feed after a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionResult {
    /// Mutual match; the matched candidate stays current
    Matched(Candidate),
    /// Moved on; a new page may have been loaded
    Advanced,
    /// The server has no more candidates
    Exhausted,
    /// Nothing was pending; the current candidate is unchanged
    Unchanged,
}

pub struct FeedSession {
    queue: CandidateQueue,
    submitter: DecisionSubmitter,
}

impl FeedSession {
    pub fn new(
        api: Arc<dyn MatchApi>,
        credentials: Arc<dyn CredentialProvider>,
        page_size: u32,
    ) -> Self {
        Self {
            queue: CandidateQueue::new(api.clone(), credentials.clone(), page_size),
            submitter: DecisionSubmitter::new(api, credentials),
        }
    }

    /// Load the first page. The feed always restarts from page 1.
    pub async fn start(&mut self) -> Result<(), FeedError> {
        self.queue.load_page(FIRST_PAGE).await
    }

    pub fn current_candidate(&self) -> Option<&Candidate> {
        self.queue.current_candidate()
    }

    pub fn queue(&self) -> &CandidateQueue {
        &self.queue
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_exhausted()
    }

    /// Submit `response` for the current candidate and move the feed on.
    ///
    /// A failed submission leaves the queue untouched. A failed page load after
    /// a successful submission is returned as `FeedError::Fetch`; `refill()`
    /// retries it.
    pub async fn decide(&mut self, response: Response) -> Result<DecisionResult, FeedError> {
        let candidate = self
            .queue
            .current_candidate()
            .cloned()
            .ok_or(FeedError::NoCurrentCandidate)?;

        let outcome = self.submitter.submit(&candidate.id, response).await?;
        if outcome.is_match() {
            info!("Matched with {} ({})", candidate.name, candidate.id);
            return Ok(DecisionResult::Matched(candidate));
        }

        match self.queue.advance() {
            AdvanceOutcome::StayedOnPage => Ok(DecisionResult::Advanced),
            AdvanceOutcome::NeedsFetch(page) => self.load(page).await,
        }
    }

    /// Load the page the queue is waiting for, if any
    pub async fn refill(&mut self) -> Result<DecisionResult, FeedError> {
        match self.queue.pending_page() {
            Some(page) => self.load(page).await,
            None if self.queue.is_exhausted() => Ok(DecisionResult::Exhausted),
            None => Ok(DecisionResult::Unchanged),
        }
    }

    async fn load(&mut self, page: u32) -> Result<DecisionResult, FeedError> {
        self.queue.load_page(page).await?;
        if self.queue.is_exhausted() {
            info!("No recommendations on page {page}, feed exhausted");
            Ok(DecisionResult::Exhausted)
        } else {
            Ok(DecisionResult::Advanced)
        }
    }
}
