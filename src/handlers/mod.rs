pub mod event;
pub mod results;
pub mod vote;

use crate::db::ElectionStore;
use crate::error::{Result, VoteError};
use crate::models::{ElectionEvent, Role, Viewer};

// The event owner and any admin may manage an event and always see its results.
async fn is_owner_or_admin(store: &dyn ElectionStore, event: &ElectionEvent, user_id: &str) -> Result<bool> {
    if event.owner_id == user_id {
        return Ok(true);
    }
    let profile = store.get_profile(user_id).await?;
    Ok(matches!(profile, Some(p) if p.role == Role::Admin))
}

async fn require_manager(store: &dyn ElectionStore, event: &ElectionEvent, user_id: &str) -> Result<()> {
    if is_owner_or_admin(store, event, user_id).await? {
        Ok(())
    } else {
        Err(VoteError::Forbidden(user_id.to_string()))
    }
}

// `None` is an anonymous visitor. A user id with no profile is treated the same.
pub async fn resolve_viewer(store: &dyn ElectionStore, event: &ElectionEvent, user_id: Option<&str>) -> Result<Viewer> {
    let Some(user_id) = user_id else {
        return Ok(Viewer::anonymous());
    };

    if store.get_profile(user_id).await?.is_none() && event.owner_id != user_id {
        return Ok(Viewer::anonymous());
    }

    Ok(Viewer {
        is_authenticated: true,
        is_owner_or_admin: is_owner_or_admin(store, event, user_id).await?,
        has_voted: store.has_voted(&event.id, user_id).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;

    #[tokio::test]
    async fn viewer_resolution() {
        let f = fixture(1).await;

        assert_eq!(resolve_viewer(&f.db, &f.event, None).await.unwrap(), Viewer::anonymous());
        assert_eq!(resolve_viewer(&f.db, &f.event, Some("stranger")).await.unwrap(), Viewer::anonymous());
        assert_eq!(
            resolve_viewer(&f.db, &f.event, Some(f.admin.id.as_str())).await.unwrap(),
            Viewer::owner()
        );
        assert_eq!(
            resolve_viewer(&f.db, &f.event, Some(f.students[0].id.as_str())).await.unwrap(),
            Viewer::voter(false)
        );
    }
}
