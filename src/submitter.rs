//! Decision Submitter
//!
//! Sends one accept/reject decision and classifies the server's answer. Only one
//! submission may be pending per submitter; a second call made before the first
//! resolves is refused instead of reaching the server twice.

use crate::api::MatchApi;
use crate::credentials::{usable_token, CredentialProvider};
use crate::error::{ApiError, FeedError};
use crate::models::{MatchOutcome, Response};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct DecisionSubmitter {
    api: Arc<dyn MatchApi>,
    credentials: Arc<dyn CredentialProvider>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the submission finishes or is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DecisionSubmitter {
    pub fn new(api: Arc<dyn MatchApi>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            api,
            credentials,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Submit `response` for `candidate_id`. Does not touch any queue.
    pub async fn submit(
        &self,
        candidate_id: &str,
        response: Response,
    ) -> Result<MatchOutcome, FeedError> {
        let token = usable_token(self.credentials.as_ref())
            .await
            .ok_or(FeedError::MissingCredential)?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refusing duplicate submission for candidate {candidate_id}");
            return Err(FeedError::SubmitInFlight {
                candidate_id: candidate_id.to_string(),
            });
        }
        let _guard = InFlightGuard(&self.in_flight);

        debug!("Submitting {response} for candidate {candidate_id}");
        let reply = self
            .api
            .submit_response(&token, candidate_id, response)
            .await
            .map_err(|source| match source {
                ApiError::InvalidCredential => FeedError::MissingCredential,
                source => {
                    warn!("Decision for candidate {candidate_id} failed: {source}");
                    FeedError::Submit {
                        candidate_id: candidate_id.to_string(),
                        source,
                    }
                }
            })?;

        let outcome = MatchOutcome::from(reply.is_match);
        if outcome.is_match() {
            info!("Mutual match with candidate {candidate_id}");
        }
        Ok(outcome)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
