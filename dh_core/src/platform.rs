//! The slice of Discord the attendance flow talks to.
//!
//! Everything that crosses the network goes through [`Platform`] so the role
//! and reaction logic can be driven without a gateway connection.

use poise::serenity_prelude::{ChannelId, Colour, GuildId, MessageId, ReactionType, RoleId, UserId};
use serenity::model::error::Error as ModelError;
use std::collections::HashSet;

/// Why a call to Discord did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// A standing configuration problem (role hierarchy, closed DMs, ...), never retried.
    #[error("missing permissions")]
    PermissionDenied,
    /// Left for the next triggering event to retry naturally.
    #[error("discord api fault: {0}")]
    Transient(String),
    /// The target message, reaction, member or role is gone.
    #[error("target no longer exists")]
    NotFound,
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<serenity::Error> for PlatformError {
    fn from(err: serenity::Error) -> Self {
        match &err {
            serenity::Error::Http(http) => match http.status_code().map(|s| s.as_u16()) {
                Some(403) => PlatformError::PermissionDenied,
                Some(404) => PlatformError::NotFound,
                _ => PlatformError::Transient(err.to_string()),
            },
            serenity::Error::Model(ModelError::InvalidPermissions { .. }) => {
                PlatformError::PermissionDenied
            }
            _ => PlatformError::Transient(err.to_string()),
        }
    }
}

/// An embed the bot posts, either in a channel or a DM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub colour: Colour,
    pub fields: Vec<(String, String, bool)>,
    pub footer: Option<String>,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>, colour: Colour) -> Self {
        Notice {
            title: title.into(),
            description: description.into(),
            colour,
            fields: Vec::new(),
            footer: None,
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push((name.into(), value.into(), inline));
        self
    }

    #[must_use]
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }
}

/// One reaction on a message together with everyone who placed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionUsers {
    pub emoji: ReactionType,
    pub users: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub user: UserId,
    pub name: String,
    pub discriminator: Option<u16>,
    pub roles: Vec<RoleId>,
}

impl RosterMember {
    #[must_use]
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    /// `name#1234` for legacy accounts, `name#0` for migrated ones.
    #[must_use]
    pub fn tag(&self) -> String {
        match self.discriminator {
            Some(discriminator) => format!("{}#{discriminator:04}", self.name),
            None => format!("{}#0", self.name),
        }
    }
}

/// A guild's roles and members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildRoster {
    pub roles: HashSet<RoleId>,
    pub members: Vec<RosterMember>,
}

#[serenity::async_trait]
pub trait Platform: Send + Sync {
    /// The bot's own user id.
    fn current_user(&self) -> UserId;

    async fn send_notice(&self, channel: ChannelId, notice: &Notice)
    -> Result<MessageId, PlatformError>;

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &ReactionType,
    ) -> Result<(), PlatformError>;

    /// The live reaction state of a message.
    async fn reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Vec<ReactionUsers>, PlatformError>;

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &ReactionType,
    ) -> Result<(), PlatformError>;

    async fn add_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Overwrites the member's whole role set.
    async fn set_member_roles(
        &self,
        guild: GuildId,
        user: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> Result<(), PlatformError>;

    fn guilds(&self) -> Vec<GuildId>;

    /// Whether `user` is a known member of `guild`, without a request.
    fn is_member(&self, guild: GuildId, user: UserId) -> bool;

    /// Every role and every member of the guild, not just what happens to be cached.
    async fn roster(&self, guild: GuildId) -> Result<GuildRoster, PlatformError>;

    async fn direct_message(&self, user: UserId, notice: &Notice) -> Result<(), PlatformError>;
}
