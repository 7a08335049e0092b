use dh_core::notices;
use dh_core::platform::Platform;
use dh_core::status::StatusStore;
use poise::serenity_prelude::{RoleId, UserId};
use std::collections::HashSet;
use tracing::{error, warn};

/// Greets a new member, showing their registered email if they already signed up.
pub async fn member_join(
    platform: &dyn Platform,
    store: &dyn StatusStore,
    prefix: &str,
    user: UserId,
) {
    let notice = match store.fetch_email(user).await {
        Ok(Some(email)) => notices::welcome_registered(&email),
        Ok(None) => notices::welcome_unregistered(prefix),
        Err(e) => {
            error!("Could not look up {user} for the welcome message: {e}");
            notices::welcome_unregistered(prefix)
        }
    };

    if let Err(e) = platform.direct_message(user, &notice).await {
        warn!("Could not welcome {user}: {e}");
    }
}

#[must_use]
pub fn roles_changed(before: &[RoleId], after: &[RoleId]) -> bool {
    let before: HashSet<_> = before.iter().collect();
    let after: HashSet<_> = after.iter().collect();
    before != after
}

/// Lets a member know their roles changed. Without the old roles nothing is sent.
pub async fn member_update(
    platform: &dyn Platform,
    user: UserId,
    before: Option<&[RoleId]>,
    after: &[RoleId],
) {
    let Some(before) = before else {
        return;
    };

    if !roles_changed(before, after) {
        return;
    }

    if let Err(e) = platform
        .direct_message(user, &notices::roles_updated())
        .await
    {
        warn!("Could not tell {user} about their new roles: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dh_core::testing::{FakePlatform, FakeStatusStore};
    use poise::serenity_prelude::GuildId;

    const USER: UserId = UserId::new(44);

    #[tokio::test]
    async fn registered_members_see_their_email() {
        let platform = FakePlatform::new();
        let store = FakeStatusStore::new();
        store.set_email(USER, "kai@example.com");

        member_join(&platform, &store, "dh.", USER).await;

        let dms = platform.dms();
        assert_eq!(dms.len(), 1);
        assert_eq!(
            dms[0].1.fields,
            vec![(
                "Registered Email".to_owned(),
                "kai@example.com".to_owned(),
                true
            )]
        );
    }

    #[tokio::test]
    async fn strangers_are_pointed_at_sync() {
        let platform = FakePlatform::new();
        let store = FakeStatusStore::new();

        member_join(&platform, &store, "dh.", USER).await;

        assert!(platform.dms()[0].1.description.contains("dh.sync"));
    }

    #[tokio::test]
    async fn role_reorders_are_not_changes() {
        let platform = FakePlatform::new();
        platform.add_member(GuildId::new(1), USER, "kai", &[]);
        let (a, b) = (RoleId::new(5), RoleId::new(6));

        member_update(&platform, USER, Some(&[a, b][..]), &[b, a]).await;
        assert!(platform.dms().is_empty());

        member_update(&platform, USER, None, &[a]).await;
        assert!(platform.dms().is_empty());

        member_update(&platform, USER, Some(&[a, b][..]), &[a]).await;
        assert_eq!(platform.dms().len(), 1);
    }
}
