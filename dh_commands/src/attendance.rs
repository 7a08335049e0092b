use crate::{Command, Context, Error};
use dh_core::announcement::AnnounceOutcome;
use dh_core::discord::SerenityPlatform;
use dh_core::notices;
use tracing::info;

pub fn commands() -> [Command; 2] {
    [announce(), close_announcement()]
}

/// Posts the attendance announcement in this channel.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn announce(ctx: Context<'_>) -> Result<(), Error> {
    info!("Announcement requested by {}", ctx.author().tag());
    let platform = SerenityPlatform::new(ctx.serenity_context());

    let reply = match ctx
        .data()
        .announcement
        .create(&platform, ctx.channel_id(), notices::announcement)
        .await
    {
        Ok(AnnounceOutcome::AlreadyActive) => "An announcement is already active.".to_owned(),
        Ok(AnnounceOutcome::Created(_)) => "Announcement sent and reactions added.".to_owned(),
        Err(e) => format!("Could not send the announcement: {e}"),
    };

    ctx.say(reply).await?;
    Ok(())
}

/// Stops tracking the current announcement. Reactions on it are ignored afterwards.
#[poise::command(
    rename = "close-announcement",
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn close_announcement(ctx: Context<'_>) -> Result<(), Error> {
    match ctx.data().announcement.close() {
        Some(message) => {
            info!("Announcement {message} closed by {}", ctx.author().tag());
            ctx.say("Announcement closed, reminders will stop.").await?;
        }
        None => {
            ctx.say("There is no active announcement.").await?;
        }
    }

    Ok(())
}
