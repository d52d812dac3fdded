use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("voter {voter_id} has already voted in event {event_id}")]
    DuplicateVote { event_id: String, voter_id: String },

    #[error("invalid event state: {0}")]
    InvalidEventState(String),

    #[error("cannot move event from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("candidate not found: {0}")]
    CandidateNotFound(String),

    #[error("candidate {0} is not approved")]
    CandidateNotApproved(String),

    #[error("user {voter_id} is not on the roster for event {event_id}")]
    NotEligible { event_id: String, voter_id: String },

    #[error("voting is not open for event {0}")]
    VotingClosed(String),

    #[error("candidates of event {event_id} can't change while it is {status}")]
    CandidatesLocked { event_id: String, status: String },

    #[error("user {0} may not manage this event")]
    Forbidden(String),

    #[error("store returned an invalid count for {context}: {value}")]
    InvalidCount { context: String, value: i64 },

    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl VoteError {
    // Callers show this as "you already voted" rather than a generic failure
    pub fn is_duplicate_vote(&self) -> bool {
        matches!(self, VoteError::DuplicateVote { .. })
    }
}

pub type Result<T> = std::result::Result<T, VoteError>;
