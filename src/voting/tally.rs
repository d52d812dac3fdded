use crate::models::{Candidate, CandidateStatus, Vote};
use crate::voting::CandidateTally;
use std::collections::{HashMap, HashSet};

// Counts for one event. `per_candidate` is ranked by votes, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub total_votes: u64,
    pub per_candidate: Vec<CandidateTally>,
    pub orphan_votes: u64,
    pub leader: Option<String>,
}

impl Tally {
    // Every candidate sharing the top count. Empty when nobody has voted.
    pub fn tied_for_lead(&self) -> Vec<&str> {
        match self.per_candidate.first() {
            Some(top) if self.total_votes > 0 => self
                .per_candidate
                .iter()
                .take_while(|c| c.votes == top.votes)
                .map(|c| c.candidate_id.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Tallies `votes` against the approved entries of `candidates`.
///
/// Candidates without votes still appear with zero. Votes naming a candidate
/// that is not in the approved list are left out of `total_votes` and counted
/// in `orphan_votes` instead.
///
/// Ranking is by vote count descending. Equal counts keep the order in which
/// the candidates were passed in (the store returns them in insertion order).
pub fn compute_tally(candidates: &[Candidate], votes: &[Vote]) -> Tally {
    let approved: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.status == CandidateStatus::Approved)
        .collect();

    // Initialize all approved candidates with 0 votes
    let mut vote_counts: HashMap<&str, u64> = HashMap::with_capacity(approved.len());
    for candidate in &approved {
        vote_counts.insert(candidate.id.as_str(), 0);
    }

    let mut orphan_votes = 0;
    for vote in votes {
        match vote_counts.get_mut(vote.candidate_id.as_str()) {
            Some(count) => *count += 1,
            None => orphan_votes += 1,
        }
    }

    let total_votes: u64 = vote_counts.values().sum();

    // Walk the approved list (not the map) so ties come out in input order
    let mut seen: HashSet<&str> = HashSet::with_capacity(approved.len());
    let mut per_candidate: Vec<CandidateTally> = approved
        .iter()
        .filter(|c| seen.insert(c.id.as_str()))
        .map(|c| {
            let votes = vote_counts[c.id.as_str()];
            CandidateTally {
                candidate_id: c.id.clone(),
                votes,
                percentage: percentage_of(votes, total_votes),
            }
        })
        .collect();

    // sort_by is stable
    per_candidate.sort_by(|a, b| b.votes.cmp(&a.votes));

    let leader = if total_votes > 0 {
        per_candidate.first().map(|c| c.candidate_id.clone())
    } else {
        None
    };

    Tally {
        total_votes,
        per_candidate,
        orphan_votes,
        leader,
    }
}

fn percentage_of(votes: u64, total_votes: u64) -> f64 {
    if total_votes == 0 {
        0.0
    } else {
        votes as f64 * 100.0 / total_votes as f64
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    pub(crate) fn approved(id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            event_id: "ev".to_string(),
            user_id: format!("user-{}", id),
            status: CandidateStatus::Approved,
            vision: String::new(),
            mission: String::new(),
            photo_url: None,
        }
    }

    pub(crate) fn vote_for(candidate_id: &str, n: usize) -> Vote {
        Vote {
            id: format!("v{}", n),
            event_id: "ev".to_string(),
            candidate_id: candidate_id.to_string(),
            voter_id: format!("voter-{}", n),
            cast_at: Utc::now(),
        }
    }

    fn votes_for(ids: &[&str]) -> Vec<Vote> {
        ids.iter().enumerate().map(|(n, id)| vote_for(id, n)).collect()
    }

    fn ranking(tally: &Tally) -> Vec<(&str, u64)> {
        tally
            .per_candidate
            .iter()
            .map(|c| (c.candidate_id.as_str(), c.votes))
            .collect()
    }

    #[test]
    fn three_candidates_five_votes() {
        let candidates = vec![approved("A"), approved("B"), approved("C")];
        let tally = compute_tally(&candidates, &votes_for(&["A", "A", "B", "A", "C"]));

        assert_eq!(tally.total_votes, 5);
        assert_eq!(ranking(&tally), vec![("A", 3), ("B", 1), ("C", 1)]);
        let percentages: Vec<f64> = tally.per_candidate.iter().map(|c| c.percentage).collect();
        assert_eq!(percentages, vec![60.0, 20.0, 20.0]);
        assert_eq!(tally.leader.as_deref(), Some("A"));
        assert_eq!(tally.orphan_votes, 0);
    }

    #[test]
    fn no_votes_keeps_input_order_and_zero_percentages() {
        let candidates = vec![approved("X"), approved("Y")];
        let tally = compute_tally(&candidates, &[]);

        assert_eq!(tally.total_votes, 0);
        assert_eq!(ranking(&tally), vec![("X", 0), ("Y", 0)]);
        assert!(tally.per_candidate.iter().all(|c| c.percentage == 0.0));
        assert_eq!(tally.leader, None);
        assert!(tally.tied_for_lead().is_empty());
    }

    #[test]
    fn ties_follow_input_order() {
        let candidates = vec![approved("C"), approved("B"), approved("A")];
        let tally = compute_tally(&candidates, &votes_for(&["A", "B", "C", "A", "C"]));

        assert_eq!(ranking(&tally), vec![("C", 2), ("A", 2), ("B", 1)]);
        assert_eq!(tally.leader.as_deref(), Some("C"));
        assert_eq!(tally.tied_for_lead(), vec!["C", "A"]);
    }

    #[test]
    fn orphan_votes_are_reported_not_counted() {
        let candidates = vec![approved("A"), approved("B")];
        let tally = compute_tally(&candidates, &votes_for(&["A", "ghost", "B", "ghost"]));

        assert_eq!(tally.total_votes, 2);
        assert_eq!(tally.orphan_votes, 2);
        assert_eq!(ranking(&tally), vec![("A", 1), ("B", 1)]);
    }

    #[test]
    fn unapproved_candidates_are_left_out() {
        let mut pending = approved("P");
        pending.status = CandidateStatus::Pending;
        let mut rejected = approved("R");
        rejected.status = CandidateStatus::Rejected;
        let candidates = vec![approved("A"), pending, rejected];

        let tally = compute_tally(&candidates, &votes_for(&["A", "P"]));
        assert_eq!(ranking(&tally), vec![("A", 1)]);
        assert_eq!(tally.total_votes, 1);
        assert_eq!(tally.orphan_votes, 1);
    }

    #[test]
    fn repeated_candidate_rows_appear_once() {
        let candidates = vec![approved("A"), approved("A"), approved("B")];
        let tally = compute_tally(&candidates, &votes_for(&["B"]));
        assert_eq!(ranking(&tally), vec![("B", 1), ("A", 0)]);
    }

    fn arb_election() -> impl Strategy<Value = (Vec<Candidate>, Vec<Vote>)> {
        (1usize..8).prop_flat_map(|n| {
            let candidates: Vec<Candidate> = (0..n).map(|i| approved(&format!("c{}", i))).collect();
            // index == n stands in for a vote pointing at an unknown candidate
            prop::collection::vec(0..=n, 0..60).prop_map(move |picks| {
                let votes = picks
                    .iter()
                    .enumerate()
                    .map(|(k, &i)| vote_for(&format!("c{}", i), k))
                    .collect();
                (candidates.clone(), votes)
            })
        })
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_total((candidates, votes) in arb_election()) {
            let tally = compute_tally(&candidates, &votes);
            let sum: u64 = tally.per_candidate.iter().map(|c| c.votes).sum();
            prop_assert_eq!(sum, tally.total_votes);
            prop_assert_eq!(tally.total_votes + tally.orphan_votes, votes.len() as u64);
        }

        #[test]
        fn prop_percentages_are_finite_and_sum_to_100((candidates, votes) in arb_election()) {
            let tally = compute_tally(&candidates, &votes);
            prop_assert!(tally.per_candidate.iter().all(|c| c.percentage.is_finite()));
            let sum: f64 = tally.per_candidate.iter().map(|c| c.percentage).sum();
            if tally.total_votes == 0 {
                prop_assert!(tally.per_candidate.iter().all(|c| c.percentage == 0.0));
            } else {
                prop_assert!((sum - 100.0).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_tally_is_deterministic((candidates, votes) in arb_election()) {
            prop_assert_eq!(compute_tally(&candidates, &votes), compute_tally(&candidates, &votes));
        }

        #[test]
        fn prop_ranking_is_descending_with_stable_ties((candidates, votes) in arb_election()) {
            let tally = compute_tally(&candidates, &votes);
            let position = |id: &str| candidates.iter().position(|c| c.id == id).unwrap();
            for pair in tally.per_candidate.windows(2) {
                prop_assert!(pair[0].votes >= pair[1].votes);
                if pair[0].votes == pair[1].votes {
                    prop_assert!(position(&pair[0].candidate_id) < position(&pair[1].candidate_id));
                }
            }
        }
    }
}
