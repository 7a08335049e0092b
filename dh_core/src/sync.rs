use crate::assign::RoleAssigner;
use crate::platform::{Platform, PlatformError};
use crate::roles::{RoleCatalog, RoleName};
use crate::status::StatusStore;
use poise::serenity_prelude::{GuildId, UserId};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synchronized(RoleName),
    NotRegistered,
    /// The stored status has no role, either unknown or not configured.
    MissingRole(String),
    StoreUnavailable,
    Failed(PlatformError),
}

impl SyncOutcome {
    /// What the invoker gets told.
    #[must_use]
    pub fn message(&self, display_name: &str) -> String {
        match self {
            SyncOutcome::Synchronized(role) => {
                format!("Successfully synchronized role {role} for {display_name}")
            }
            SyncOutcome::NotRegistered => "Failed to synchronize: User not found in DB".to_owned(),
            SyncOutcome::MissingRole(_) => "Failed to synchronize due to missing role".to_owned(),
            SyncOutcome::StoreUnavailable => {
                "Failed to synchronize: the dashboard could not be reached".to_owned()
            }
            SyncOutcome::Failed(PlatformError::PermissionDenied) => {
                "Failed to synchronize due to insufficient permissions".to_owned()
            }
            SyncOutcome::Failed(PlatformError::NotFound) => {
                "Failed to synchronize: member or role no longer exists".to_owned()
            }
            SyncOutcome::Failed(_) => "Failed to synchronize due to an API error".to_owned(),
        }
    }
}

/// Gives `user` exactly the role matching their dashboard status.
pub async fn synchronize(
    platform: &dyn Platform,
    store: &dyn StatusStore,
    roles: &RoleCatalog,
    guild: GuildId,
    user: UserId,
) -> SyncOutcome {
    let status = match store.fetch_status(user).await {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!("No user found in DB for {user}");
            return SyncOutcome::NotRegistered;
        }
        Err(e) => {
            error!("Could not fetch the status of {user}: {e}");
            return SyncOutcome::StoreUnavailable;
        }
    };
    debug!("Fetched status `{status}` for {user}");

    let Some(role) = status
        .parse::<RoleName>()
        .ok()
        .filter(|role| roles.get(*role).is_some())
    else {
        warn!("Status `{status}` of {user} does not map onto a configured role");
        return SyncOutcome::MissingRole(status);
    };

    match RoleAssigner::new(platform, roles)
        .replace(guild, user, role, "Dashboard status sync")
        .await
    {
        Ok(()) => SyncOutcome::Synchronized(role),
        Err(e) => SyncOutcome::Failed(e),
    }
}

/// The lowest-id guild `user` shares with the bot.
#[must_use]
pub fn mutual_guild(platform: &dyn Platform, user: UserId) -> Option<GuildId> {
    let mut guilds = platform.guilds();
    guilds.sort_unstable();
    guilds
        .into_iter()
        .find(|guild| platform.is_member(*guild, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, FakeStatusStore, catalog};

    const GUILD: GuildId = GuildId::new(1);
    const USER: UserId = UserId::new(31);

    #[tokio::test]
    async fn status_becomes_the_only_role() {
        let platform = FakePlatform::new();
        let roles = catalog();
        platform.add_member(GUILD, USER, "sam", &[roles.get(RoleName::Pending).unwrap()]);
        let store = FakeStatusStore::new();
        store.set_status(USER, "accepted");

        let outcome = synchronize(&platform, &store, &roles, GUILD, USER).await;

        assert_eq!(outcome, SyncOutcome::Synchronized(RoleName::Accepted));
        assert_eq!(
            platform.member_roles(GUILD, USER),
            vec![roles.required(RoleName::Accepted)]
        );
        assert_eq!(
            outcome.message("sam"),
            "Successfully synchronized role accepted for sam"
        );
    }

    #[tokio::test]
    async fn unknown_members_are_reported() {
        let platform = FakePlatform::new();
        let roles = catalog();
        platform.add_member(GUILD, USER, "sam", &[]);
        let store = FakeStatusStore::new();

        let outcome = synchronize(&platform, &store, &roles, GUILD, USER).await;
        assert_eq!(outcome, SyncOutcome::NotRegistered);
        assert_eq!(platform.role_mutations(), 0);
    }

    #[tokio::test]
    async fn unmapped_status_is_a_missing_role() {
        let platform = FakePlatform::new();
        let roles = catalog();
        platform.add_member(GUILD, USER, "sam", &[]);
        let store = FakeStatusStore::new();
        store.set_status(USER, "mentor");

        let outcome = synchronize(&platform, &store, &roles, GUILD, USER).await;
        assert_eq!(outcome, SyncOutcome::MissingRole("mentor".to_owned()));
        assert_eq!(
            outcome.message("sam"),
            "Failed to synchronize due to missing role"
        );
    }

    #[tokio::test]
    async fn permission_failures_are_worded_for_humans() {
        let platform = FakePlatform::new();
        let roles = catalog();
        platform.add_member(GUILD, USER, "sam", &[]);
        platform.deny_role_edits(USER);
        let store = FakeStatusStore::new();
        store.set_status(USER, "selected");

        let outcome = synchronize(&platform, &store, &roles, GUILD, USER).await;
        assert_eq!(
            outcome.message("sam"),
            "Failed to synchronize due to insufficient permissions"
        );
    }

    #[test]
    fn mutual_guild_is_the_lowest_shared_one() {
        let platform = FakePlatform::new();
        platform.add_member(GuildId::new(9), USER, "sam", &[]);
        platform.add_member(GuildId::new(5), USER, "sam", &[]);
        platform.add_member(GuildId::new(2), UserId::new(77), "other", &[]);

        assert_eq!(mutual_guild(&platform, USER), Some(GuildId::new(5)));
        assert_eq!(mutual_guild(&platform, UserId::new(78)), None);
    }
}
