use crate::db::ElectionStore;
use crate::error::{Result, VoteError};
use crate::handlers::resolve_viewer;
use crate::voting::{build_snapshot, can_view, EventVisibility, ResultSnapshot};
use log::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    Visible(ResultSnapshot),
    Hidden,
}

/// Loads an event's results for `viewer_id` (`None` for anonymous visitors).
///
/// The visibility check runs before any vote rows are read. Events whose
/// stored status or type can't be read are hidden rather than failing.
pub async fn view_results(store: &dyn ElectionStore, event_id: &str, viewer_id: Option<&str>) -> Result<ResultsView> {
    let event = match store.get_event(event_id).await {
        Ok(event) => event,
        Err(VoteError::InvalidEventState(reason)) => {
            warn!("Event {} has an invalid state ({}); hiding results", event_id, reason);
            return Ok(ResultsView::Hidden);
        }
        Err(e) => return Err(e),
    };

    let viewer = resolve_viewer(store, &event, viewer_id).await?;
    if !can_view(&EventVisibility::from(&event), &viewer) {
        info!("Results for event {} hidden from viewer {:?}", event_id, viewer_id);
        return Ok(ResultsView::Hidden);
    }

    let candidates = store.approved_candidates(event_id).await?;
    let votes = store.event_votes(event_id).await?;
    let voter_groups = store.voter_groups(event_id).await?;
    let class_counts = store.class_member_counts(event_id).await?;

    let snapshot = build_snapshot(&candidates, &votes, &voter_groups, &class_counts);
    if snapshot.orphan_votes > 0 {
        warn!(
            "Event {} has {} vote(s) for candidates that are not approved; left out of the tally",
            event_id, snapshot.orphan_votes
        );
    }

    Ok(ResultsView::Visible(snapshot))
}
