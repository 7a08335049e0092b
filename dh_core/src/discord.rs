use crate::platform::{GuildRoster, Notice, Platform, PlatformError, ReactionUsers, RosterMember};
use poise::serenity_prelude::{
    self as serenity, ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMember,
    GuildId, MessageId, ReactionType, RoleId, UserId,
};

// Discord caps a reaction user page at 100 and a member page at 1000.
const REACTION_PAGE: u8 = 100;
const MEMBER_PAGE: u64 = 1000;

/// [`Platform`] backed by a live serenity client.
#[derive(Clone)]
pub struct SerenityPlatform {
    ctx: serenity::Context,
}

impl SerenityPlatform {
    #[must_use]
    pub fn new(ctx: &serenity::Context) -> Self {
        SerenityPlatform { ctx: ctx.clone() }
    }
}

#[must_use]
pub fn embed(notice: &Notice) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title(&notice.title).colour(notice.colour);

    if !notice.description.is_empty() {
        embed = embed.description(&notice.description);
    }

    for (name, value, inline) in &notice.fields {
        embed = embed.field(name, value, *inline);
    }

    if let Some(footer) = &notice.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }

    embed
}

#[serenity::async_trait]
impl Platform for SerenityPlatform {
    fn current_user(&self) -> UserId {
        self.ctx.cache.current_user().id
    }

    async fn send_notice(
        &self,
        channel: ChannelId,
        notice: &Notice,
    ) -> Result<MessageId, PlatformError> {
        let message = channel
            .send_message(&self.ctx, CreateMessage::new().embed(embed(notice)))
            .await?;
        Ok(message.id)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &ReactionType,
    ) -> Result<(), PlatformError> {
        self.ctx.http.create_reaction(channel, message, emoji).await?;
        Ok(())
    }

    async fn reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Vec<ReactionUsers>, PlatformError> {
        let message = self.ctx.http.get_message(channel, message).await?;

        let mut reactions = Vec::with_capacity(message.reactions.len());
        for reaction in message.reactions {
            let mut users = Vec::new();
            let mut after = None;
            loop {
                let page = channel
                    .reaction_users(
                        &self.ctx.http,
                        message.id,
                        reaction.reaction_type.clone(),
                        Some(REACTION_PAGE),
                        after,
                    )
                    .await?;

                let full = page.len() == usize::from(REACTION_PAGE);
                after = page.last().map(|u| u.id);
                users.extend(page.into_iter().map(|u| u.id));

                if !full {
                    break;
                }
            }

            reactions.push(ReactionUsers {
                emoji: reaction.reaction_type,
                users,
            });
        }

        Ok(reactions)
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &ReactionType,
    ) -> Result<(), PlatformError> {
        self.ctx
            .http
            .delete_reaction(channel, message, user, emoji)
            .await?;
        Ok(())
    }

    async fn add_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.ctx
            .http
            .add_member_role(guild, user, role, Some(reason))
            .await?;
        Ok(())
    }

    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        self.ctx
            .http
            .remove_member_role(guild, user, role, Some(reason))
            .await?;
        Ok(())
    }

    async fn set_member_roles(
        &self,
        guild: GuildId,
        user: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> Result<(), PlatformError> {
        guild
            .edit_member(
                &self.ctx,
                user,
                EditMember::new()
                    .roles(roles.iter().copied())
                    .audit_log_reason(reason),
            )
            .await?;
        Ok(())
    }

    fn guilds(&self) -> Vec<GuildId> {
        self.ctx.cache.guilds()
    }

    fn is_member(&self, guild: GuildId, user: UserId) -> bool {
        self.ctx
            .cache
            .guild(guild)
            .is_some_and(|g| g.members.contains_key(&user))
    }

    async fn roster(&self, guild: GuildId) -> Result<GuildRoster, PlatformError> {
        let roles = self.ctx.http.get_guild_roles(guild).await?;

        let mut members = Vec::new();
        let mut after = None;
        loop {
            let page = self
                .ctx
                .http
                .get_guild_members(guild, Some(MEMBER_PAGE), after)
                .await?;
            let last_page = (page.len() as u64) < MEMBER_PAGE;
            after = page.last().map(|member| member.user.id.get());

            members.extend(page.into_iter().map(|member| RosterMember {
                user: member.user.id,
                name: member.user.name,
                discriminator: member.user.discriminator.map(std::num::NonZeroU16::get),
                roles: member.roles,
            }));

            if last_page {
                break;
            }
        }

        Ok(GuildRoster {
            roles: roles.into_iter().map(|role| role.id).collect(),
            members,
        })
    }

    async fn direct_message(&self, user: UserId, notice: &Notice) -> Result<(), PlatformError> {
        let channel = user.create_dm_channel(&self.ctx).await?;
        channel
            .id
            .send_message(&self.ctx, CreateMessage::new().embed(embed(notice)))
            .await?;
        Ok(())
    }
}
