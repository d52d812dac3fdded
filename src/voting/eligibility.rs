use crate::models::VoterGroup;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible_voter_count: u64,
}

/// Counts the voters on an event's roster.
///
/// The roster is the union of every class linked to the event. A profile holds
/// at most one class, so adding up the per-class member counts gives the size
/// of that union. If profiles ever gain multiple classes this has to become a
/// distinct count over user ids instead of a sum.
pub fn compute_eligibility(
    voter_groups: &[VoterGroup],
    class_member_counts: &HashMap<String, u64>,
) -> Eligibility {
    let classes: HashSet<&str> = voter_groups.iter().map(|g| g.class_id.as_str()).collect();

    let eligible_voter_count = classes
        .into_iter()
        .map(|class_id| class_member_counts.get(class_id).copied().unwrap_or(0))
        .sum();

    Eligibility { eligible_voter_count }
}

pub fn participation_rate(total_votes: u64, eligible_voter_count: u64) -> f64 {
    if eligible_voter_count == 0 {
        0.0
    } else {
        total_votes as f64 / eligible_voter_count as f64
    }
}
