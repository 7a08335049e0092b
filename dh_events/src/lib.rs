#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use dh_core::discord::SerenityPlatform;
use poise::serenity_prelude as serenity;
use reactions::{ReactionAction, ReactionEvent, ReactionReconciler};
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) use dh_core::structs::{Data, Error};
mod members;
pub mod reactions;
pub mod reminders;

pub async fn handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Arc<Data>,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!("Logged in as {}", data_about_bot.user.tag());
        }
        serenity::FullEvent::CacheReady { guilds } => {
            info!("Cache ready with {} guilds", guilds.len());
            reminders::start(Arc::new(SerenityPlatform::new(ctx)), data);
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            // Large guilds only send online members up front.
            if guild.large {
                debug!("Requesting the member list of {}", guild.id);
                ctx.shard
                    .chunk_guild(guild.id, None, false, serenity::ChunkGuildFilter::None, None);
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            reconcile(ctx, data, ReactionEvent::new(add_reaction, ReactionAction::Add)).await;
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            reconcile(
                ctx,
                data,
                ReactionEvent::new(removed_reaction, ReactionAction::Remove),
            )
            .await;
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            let platform = SerenityPlatform::new(ctx);
            members::member_join(&platform, &*data.status, &data.prefix, new_member.user.id)
                .await;
        }
        serenity::FullEvent::GuildMemberUpdate {
            old_if_available,
            new: _,
            event,
        } => {
            if event.user.bot {
                return Ok(());
            }
            let platform = SerenityPlatform::new(ctx);
            members::member_update(
                &platform,
                event.user.id,
                old_if_available.as_ref().map(|m| m.roles.as_slice()),
                &event.roles,
            )
            .await;
        }
        _ => {}
    }
    Ok(())
}

async fn reconcile(ctx: &serenity::Context, data: &Data, event: ReactionEvent) {
    let platform = SerenityPlatform::new(ctx);
    ReactionReconciler::new(&platform, &data.announcement, &data.roles)
        .handle(&event)
        .await;
}
