pub mod eligibility;
pub mod tally;
pub mod visibility;

use crate::models::{Candidate, Vote, VoterGroup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use eligibility::{compute_eligibility, participation_rate, Eligibility};
pub use tally::{compute_tally, Tally};
pub use visibility::{can_view, can_view_raw, EventVisibility};

// One row of the ranked results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate_id: String,
    pub votes: u64,
    pub percentage: f64,
}

// Results for an event, derived from current rows. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSnapshot {
    pub total_votes: u64,
    pub per_candidate: Vec<CandidateTally>,
    pub eligible_voter_count: u64,
    pub participation_rate: f64,
    pub leader: Option<String>,
    // Votes that pointed at a candidate outside the approved list
    pub orphan_votes: u64,
}

pub fn build_snapshot(
    candidates: &[Candidate],
    votes: &[Vote],
    voter_groups: &[VoterGroup],
    class_member_counts: &HashMap<String, u64>,
) -> ResultSnapshot {
    let tally = compute_tally(candidates, votes);
    let eligibility = compute_eligibility(voter_groups, class_member_counts);

    ResultSnapshot {
        participation_rate: participation_rate(tally.total_votes, eligibility.eligible_voter_count),
        total_votes: tally.total_votes,
        per_candidate: tally.per_candidate,
        eligible_voter_count: eligibility.eligible_voter_count,
        leader: tally.leader,
        orphan_votes: tally.orphan_votes,
    }
}
