pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod queue;
pub mod session;
pub mod submitter;

pub use api::{HttpMatchApi, MatchApi};
pub use config::FeedConfig;
pub use credentials::{CredentialProvider, EnvToken, FileToken, StaticToken};
pub use error::{ApiError, FeedError};
pub use models::{Candidate, Game, Gender, MatchEntry, MatchOutcome, Page, Response};
pub use queue::{AdvanceOutcome, CandidateQueue};
pub use session::{DecisionResult, FeedSession};
pub use submitter::DecisionSubmitter;
