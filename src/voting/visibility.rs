use crate::models::{ElectionEvent, ElectionType, EventStatus, Viewer};
use log::warn;

// The parts of an event that decide who may see its tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventVisibility {
    pub status: EventStatus,
    pub election_type: ElectionType,
    pub public_results: bool,
    pub show_results_after_voting: bool,
}

impl From<&ElectionEvent> for EventVisibility {
    fn from(event: &ElectionEvent) -> Self {
        Self {
            status: event.status,
            election_type: event.election_type,
            public_results: event.public_results,
            show_results_after_voting: event.show_results_after_voting,
        }
    }
}

/// Decides whether `viewer` may see the tally of `event` right now.
///
/// | status | type   | public | anonymous | voter                     | owner/admin |
/// |--------|--------|--------|-----------|---------------------------|-------------|
/// | draft  | any    | any    | no        | no                        | yes         |
/// | active | open   | any    | yes       | yes                       | yes         |
/// | active | closed | any    | no        | only if voted and allowed | yes         |
/// | closed | any    | true   | yes       | yes                       | yes         |
/// | closed | any    | false  | no        | yes                       | yes         |
///
/// "Allowed" means the event has `show_results_after_voting` set.
pub fn can_view(event: &EventVisibility, viewer: &Viewer) -> bool {
    // Admin rights without a session are ignored
    let is_owner = viewer.is_authenticated && viewer.is_owner_or_admin;
    if is_owner {
        return true;
    }

    match (event.status, event.election_type) {
        (EventStatus::Draft, _) => false,
        (EventStatus::Active, ElectionType::Open) => true,
        (EventStatus::Active, ElectionType::Closed) => {
            viewer.is_authenticated && event.show_results_after_voting && viewer.has_voted
        }
        (EventStatus::Closed, _) => event.public_results || viewer.is_authenticated,
    }
}

/// Same as [`can_view`] for status and type strings straight from storage.
/// Values we don't recognise deny access.
pub fn can_view_raw(
    status: &str,
    election_type: &str,
    public_results: bool,
    show_results_after_voting: bool,
    viewer: &Viewer,
) -> bool {
    let parsed = status
        .parse::<EventStatus>()
        .and_then(|status| election_type.parse::<ElectionType>().map(|t| (status, t)));

    match parsed {
        Ok((status, election_type)) => can_view(
            &EventVisibility {
                status,
                election_type,
                public_results,
                show_results_after_voting,
            },
            viewer,
        ),
        Err(e) => {
            warn!("Hiding results for event with unreadable settings: {}", e);
            false
        }
    }
}
