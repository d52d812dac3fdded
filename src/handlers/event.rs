use crate::db::ElectionStore;
use crate::error::{Result, VoteError};
use crate::handlers::require_manager;
use crate::models::{CandidateStatus, EventStatus};
use log::info;

/// Moves an event one step along `draft -> active -> closed`.
/// Only the owner or an admin may do this.
pub async fn transition_event(
    store: &dyn ElectionStore,
    event_id: &str,
    actor_id: &str,
    next: EventStatus,
) -> Result<()> {
    let event = store.get_event(event_id).await?;
    require_manager(store, &event, actor_id).await?;

    if !event.status.can_transition_to(next) {
        return Err(VoteError::InvalidTransition {
            from: event.status.to_string(),
            to: next.to_string(),
        });
    }

    // Lost a race with another transition (e.g. the close sweep)
    if !store.update_event_status(event_id, event.status, next).await? {
        let current = store.get_event(event_id).await?;
        return Err(VoteError::InvalidTransition {
            from: current.status.to_string(),
            to: next.to_string(),
        });
    }

    info!("Event {} moved from {} to {} by {}", event_id, event.status, next, actor_id);
    Ok(())
}

pub async fn approve_candidate(store: &dyn ElectionStore, candidate_id: &str, actor_id: &str) -> Result<()> {
    review_candidate(store, candidate_id, actor_id, CandidateStatus::Approved).await
}

pub async fn reject_candidate(store: &dyn ElectionStore, candidate_id: &str, actor_id: &str) -> Result<()> {
    review_candidate(store, candidate_id, actor_id, CandidateStatus::Rejected).await
}

async fn review_candidate(
    store: &dyn ElectionStore,
    candidate_id: &str,
    actor_id: &str,
    status: CandidateStatus,
) -> Result<()> {
    let candidate = store.get_candidate(candidate_id).await?;
    let event = store.get_event(&candidate.event_id).await?;
    require_manager(store, &event, actor_id).await?;

    // Once voting opens, ballots may already point at this candidate
    if event.status != EventStatus::Draft {
        return Err(VoteError::CandidatesLocked {
            event_id: event.id.clone(),
            status: event.status.to_string(),
        });
    }

    store.set_candidate_status(candidate_id, status).await?;
    info!("Candidate {} marked {} by {}", candidate_id, status.as_str(), actor_id);
    Ok(())
}
