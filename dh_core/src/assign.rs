use crate::platform::{Platform, PlatformError};
use crate::roles::{RoleCatalog, RoleName};
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use tracing::{debug, error, warn};

/// Grants and takes away catalog roles.
///
/// Every method performs exactly one role mutation on the platform and never retries; a
/// failure is logged here and handed back so the caller can word it for a human.
pub struct RoleAssigner<'a> {
    platform: &'a dyn Platform,
    roles: &'a RoleCatalog,
}

impl<'a> RoleAssigner<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform, roles: &'a RoleCatalog) -> Self {
        RoleAssigner { platform, roles }
    }

    /// Adds `role`, a member already holding it is left as is.
    pub async fn assign(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleName,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let role_id = self.resolve(user, role)?;
        let result = self
            .platform
            .add_member_role(guild, user, role_id, reason)
            .await;
        report(result, "add", user, role, role_id)
    }

    /// Removes `role`, a member without it is left as is.
    pub async fn revoke(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleName,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let role_id = self.resolve(user, role)?;
        let result = self
            .platform
            .remove_member_role(guild, user, role_id, reason)
            .await;
        report(result, "remove", user, role, role_id)
    }

    /// Makes `role` the member's only role.
    pub async fn replace(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleName,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let role_id = self.resolve(user, role)?;
        let result = self
            .platform
            .set_member_roles(guild, user, &[role_id], reason)
            .await;
        report(result, "set", user, role, role_id)
    }

    fn resolve(&self, user: UserId, role: RoleName) -> Result<RoleId, PlatformError> {
        self.roles.get(role).ok_or_else(|| {
            error!("Cannot change `{role}` for {user}: no role id is configured for it.");
            PlatformError::Configuration(format!("no role id configured for `{role}`"))
        })
    }
}

fn report(
    result: Result<(), PlatformError>,
    action: &str,
    user: UserId,
    role: RoleName,
    role_id: RoleId,
) -> Result<(), PlatformError> {
    match &result {
        Ok(()) => debug!("{action} `{role}` ({role_id}) for {user}: ok"),
        Err(PlatformError::NotFound) => {
            warn!("{action} `{role}` ({role_id}) for {user}: member or role no longer exists");
        }
        Err(PlatformError::PermissionDenied) => {
            error!("{action} `{role}` ({role_id}) for {user}: missing permissions");
        }
        Err(e) => error!("{action} `{role}` ({role_id}) for {user}: {e}"),
    }
    result
}
