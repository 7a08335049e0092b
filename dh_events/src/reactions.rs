use dh_core::announcement::{AnnouncementTracker, ReactionKind};
use dh_core::assign::RoleAssigner;
use dh_core::platform::{Platform, PlatformError};
use dh_core::roles::{RoleCatalog, RoleName};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, Reaction, ReactionType, UserId};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild: Option<GuildId>,
    pub channel: ChannelId,
    pub message: MessageId,
    pub user: Option<UserId>,
    pub emoji: ReactionType,
    pub action: ReactionAction,
}

impl ReactionEvent {
    #[must_use]
    pub fn new(reaction: &Reaction, action: ReactionAction) -> Self {
        ReactionEvent {
            guild: reaction.guild_id,
            channel: reaction.channel_id,
            message: reaction.message_id,
            user: reaction.user_id,
            emoji: reaction.emoji.clone(),
            action,
        }
    }
}

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not on the announcement, from the bot itself, or outside a guild.
    Ignored,
    Handled {
        role_change: Option<(RoleName, Result<(), PlatformError>)>,
        /// The acting user's other reactions taken off the announcement.
        swept: Vec<ReactionType>,
    },
}

/// Mirrors reactions on the announcement into the attending/withdrawn roles.
///
/// Discord has no "pick one" reaction, so after every add the other reactions of that
/// user are removed again. For a moment both can be visible; the removal comes back
/// as a remove event which revokes the stale role.
pub struct ReactionReconciler<'a> {
    platform: &'a dyn Platform,
    announcement: &'a AnnouncementTracker,
    roles: &'a RoleCatalog,
}

impl<'a> ReactionReconciler<'a> {
    #[must_use]
    pub fn new(
        platform: &'a dyn Platform,
        announcement: &'a AnnouncementTracker,
        roles: &'a RoleCatalog,
    ) -> Self {
        ReactionReconciler {
            platform,
            announcement,
            roles,
        }
    }

    pub async fn handle(&self, event: &ReactionEvent) -> Reconciliation {
        if self.announcement.current() != Some(event.message) {
            return Reconciliation::Ignored;
        }

        let (Some(guild), Some(user)) = (event.guild, event.user) else {
            return Reconciliation::Ignored;
        };

        if user == self.platform.current_user() {
            return Reconciliation::Ignored;
        }

        let role_change = match ReactionKind::from_reaction(&event.emoji) {
            Some(kind) => Some((kind.role(), self.apply(guild, user, kind, event.action).await)),
            None => None,
        };

        let swept = match event.action {
            ReactionAction::Add => self.sweep(event, user).await,
            ReactionAction::Remove => Vec::new(),
        };

        Reconciliation::Handled { role_change, swept }
    }

    async fn apply(
        &self,
        guild: GuildId,
        user: UserId,
        kind: ReactionKind,
        action: ReactionAction,
    ) -> Result<(), PlatformError> {
        let assigner = RoleAssigner::new(self.platform, self.roles);
        match (action, kind) {
            (ReactionAction::Add, ReactionKind::Confirm) => {
                assigner
                    .assign(guild, user, kind.role(), "Attendance confirmed")
                    .await
            }
            (ReactionAction::Add, ReactionKind::Withdraw) => {
                assigner
                    .assign(guild, user, kind.role(), "Attendance withdrawn")
                    .await
            }
            (ReactionAction::Remove, _) => {
                let reason = format!("Attendance reaction removed ({})", kind.emoji());
                assigner.revoke(guild, user, kind.role(), &reason).await
            }
        }
    }

    /// Removes every reaction of `user` on the announcement other than the one just added.
    ///
    /// Failures are logged and skipped, the next event corrects whatever is left.
    async fn sweep(&self, event: &ReactionEvent, user: UserId) -> Vec<ReactionType> {
        let reactions = match self.platform.reactions(event.channel, event.message).await {
            Ok(reactions) => reactions,
            Err(e) => {
                error!("Error fetching announcement {}: {e}", event.message);
                return Vec::new();
            }
        };

        let mut swept = Vec::new();
        for reaction in reactions {
            if same_emoji(&reaction.emoji, &event.emoji) || !reaction.users.contains(&user) {
                continue;
            }

            match self
                .platform
                .remove_reaction(event.channel, event.message, user, &reaction.emoji)
                .await
            {
                Ok(()) => {
                    debug!("Removed conflicting reaction {} from {user}", reaction.emoji);
                    swept.push(reaction.emoji);
                }
                Err(PlatformError::NotFound) => {
                    warn!("Conflicting reaction {} of {user} was already gone", reaction.emoji);
                }
                Err(e) => error!("Error removing reaction {} of {user}: {e}", reaction.emoji),
            }
        }
        swept
    }
}

// Custom emoji names can change, their ids can't.
fn same_emoji(a: &ReactionType, b: &ReactionType) -> bool {
    match (a, b) {
        (ReactionType::Custom { id: a, .. }, ReactionType::Custom { id: b, .. }) => a == b,
        (ReactionType::Unicode(a), ReactionType::Unicode(b)) => a == b,
        _ => false,
    }
}
