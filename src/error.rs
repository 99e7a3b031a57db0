use thiserror::Error;

/// Failures talking to the matching backend
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server responded with HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Bearer token cannot be sent in an Authorization header")]
    InvalidCredential,
}

/// Errors returned by the candidate queue and the decision submitter
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("No valid authentication credential available")]
    MissingCredential,
    #[error("Failed to load recommendations page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: ApiError,
    },
    #[error("Failed to submit decision for candidate {candidate_id}: {source}")]
    Submit {
        candidate_id: String,
        #[source]
        source: ApiError,
    },
    #[error("A decision for candidate {candidate_id} is already being submitted")]
    SubmitInFlight { candidate_id: String },
    #[error("No candidate is currently available")]
    NoCurrentCandidate,
}

impl FeedError {
    /// Whether retrying the same operation can succeed without outside action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FeedError::Fetch { .. } | FeedError::Submit { .. } | FeedError::SubmitInFlight { .. }
        )
    }
}
