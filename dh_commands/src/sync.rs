use crate::{Command, Context, Error};
use dh_core::discord::SerenityPlatform;
use dh_core::sync::{mutual_guild, synchronize};
use poise::serenity_prelude::Member;
use tracing::info;

pub fn commands() -> [Command; 2] {
    [sync(), adminsync()]
}

/// Sync your dashboard status with your discord role.
#[poise::command(prefix_command, dm_only, user_cooldown = 3600, aliases("s"))]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    let user = ctx.author().id;
    let platform = SerenityPlatform::new(ctx.serenity_context());
    let Some(guild) = mutual_guild(&platform, user) else {
        ctx.say("You don't share a server with me, join it first.")
            .await?;
        return Ok(());
    };

    let data = ctx.data();
    let outcome = synchronize(&platform, &*data.status, &data.roles, guild, user).await;
    info!("Sync for {user} in {guild}: {outcome:?}");

    ctx.say(outcome.message(&ctx.author().name)).await?;
    Ok(())
}

/// Sync another member's dashboard status.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_ROLES",
    aliases("as")
)]
pub async fn adminsync(
    ctx: Context<'_>,
    #[description = "The member to synchronize."] member: Member,
) -> Result<(), Error> {
    let data = ctx.data();
    let platform = SerenityPlatform::new(ctx.serenity_context());
    let outcome = synchronize(
        &platform,
        &*data.status,
        &data.roles,
        member.guild_id,
        member.user.id,
    )
    .await;
    info!(
        "{} synced {} in {}: {outcome:?}",
        ctx.author().tag(),
        member.user.id,
        member.guild_id
    );

    ctx.say(outcome.message(&member.user.name)).await?;
    Ok(())
}
