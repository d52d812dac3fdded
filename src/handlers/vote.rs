use crate::db::ElectionStore;
use crate::error::{Result, VoteError};
use crate::models::{CandidateStatus, EventStatus, Vote};
use chrono::{DateTime, Utc};
use log::{info, warn};

/// Records `voter_id`'s ballot for `candidate_id` in `event_id`.
///
/// The event must be active and inside its voting window, the candidate must
/// be approved for this event, and the voter's class must be on the event's
/// roster. A second ballot from the same voter comes back as
/// [`VoteError::DuplicateVote`].
pub async fn cast_vote(
    store: &dyn ElectionStore,
    event_id: &str,
    candidate_id: &str,
    voter_id: &str,
    now: DateTime<Utc>,
) -> Result<Vote> {
    info!("Recording vote: event_id={}, candidate_id={}, voter_id={}", event_id, candidate_id, voter_id);

    let event = store.get_event(event_id).await?;
    if event.status != EventStatus::Active || !event.is_within_voting_window(now) {
        warn!("Vote for event {} rejected: status {} at {}", event_id, event.status, now.to_rfc3339());
        return Err(VoteError::VotingClosed(event_id.to_string()));
    }

    let candidate = store.get_candidate(candidate_id).await?;
    if candidate.event_id != event_id {
        return Err(VoteError::CandidateNotFound(candidate_id.to_string()));
    }
    if candidate.status != CandidateStatus::Approved {
        return Err(VoteError::CandidateNotApproved(candidate_id.to_string()));
    }

    if !store.is_eligible(event_id, voter_id).await? {
        warn!("User {} is not on the roster for event {}", voter_id, event_id);
        return Err(VoteError::NotEligible {
            event_id: event_id.to_string(),
            voter_id: voter_id.to_string(),
        });
    }

    let vote = Vote::new(event_id.to_string(), candidate_id.to_string(), voter_id.to_string(), now);
    match store.cast_vote(&vote).await {
        Ok(()) => {
            info!("Successfully recorded vote {}", vote.id);
            Ok(vote)
        }
        Err(e) if e.is_duplicate_vote() => {
            info!("User {} already voted in event {}", voter_id, event_id);
            Err(e)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;
    use crate::models::{Candidate, ElectionEvent, ElectionType, Profile, Role};
    use chrono::Duration;

    #[tokio::test]
    async fn eligible_voter_votes_once() {
        let f = fixture(2).await;
        let voter = &f.students[0].id;

        let vote = cast_vote(&f.db, &f.event.id, &f.candidates[0].id, voter, Utc::now()).await.unwrap();
        assert_eq!(vote.voter_id, *voter);

        let again = cast_vote(&f.db, &f.event.id, &f.candidates[1].id, voter, Utc::now()).await;
        assert!(matches!(again, Err(VoteError::DuplicateVote { .. })));
    }

    #[tokio::test]
    async fn voter_outside_roster_is_rejected() {
        let f = fixture(0).await;
        let outsider = Profile::new("Tamu".into(), Role::Voter, None);
        f.db.create_profile(&outsider).await.unwrap();

        let result = cast_vote(&f.db, &f.event.id, &f.candidates[0].id, &outsider.id, Utc::now()).await;
        assert!(matches!(result, Err(VoteError::NotEligible { .. })));
    }

    #[tokio::test]
    async fn voting_outside_window_or_status_is_rejected() {
        let f = fixture(1).await;
        let voter = &f.students[0].id;

        let too_late = Utc::now() + Duration::hours(3);
        let result = cast_vote(&f.db, &f.event.id, &f.candidates[0].id, voter, too_late).await;
        assert!(matches!(result, Err(VoteError::VotingClosed(_))));

        f.db.update_event_status(&f.event.id, EventStatus::Active, EventStatus::Closed).await.unwrap();
        let result = cast_vote(&f.db, &f.event.id, &f.candidates[0].id, voter, Utc::now()).await;
        assert!(matches!(result, Err(VoteError::VotingClosed(_))));
    }

    #[tokio::test]
    async fn candidate_must_be_approved_and_belong_to_event() {
        let f = fixture(1).await;
        let voter = &f.students[0].id;

        let pending = Candidate::new(f.event.id.clone(), "D".into(), "v".into(), "m".into());
        f.db.add_candidate(&pending).await.unwrap();
        let result = cast_vote(&f.db, &f.event.id, &pending.id, voter, Utc::now()).await;
        assert!(matches!(result, Err(VoteError::CandidateNotApproved(_))));

        let now = Utc::now();
        let other_event = ElectionEvent::new(
            "Pemilihan HIMA".into(),
            f.admin.id.clone(),
            ElectionType::Open,
            now - Duration::hours(1),
            now + Duration::hours(1),
        );
        f.db.create_event(&other_event).await.unwrap();
        let mut foreign = Candidate::new(other_event.id.clone(), "E".into(), "v".into(), "m".into());
        foreign.status = CandidateStatus::Approved;
        f.db.add_candidate(&foreign).await.unwrap();

        let result = cast_vote(&f.db, &f.event.id, &foreign.id, voter, Utc::now()).await;
        assert!(matches!(result, Err(VoteError::CandidateNotFound(_))));
        assert!(!f.db.has_voted(&f.event.id, voter).await.unwrap());
    }
}
