use crate::{Command, Context, Error};
use dh_core::assign::RoleAssigner;
use dh_core::discord::SerenityPlatform;
use dh_core::platform::Platform;
use dh_core::volunteers::{Crew, assign_crew, crew_status, render_table};
use itertools::Itertools;
use tracing::{error, info};

pub fn commands() -> [Command; 2] {
    [volunteers(), assign_volunteers()]
}

/// Show whether listed volunteers and mentors joined and signed up.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn volunteers(ctx: Context<'_>) -> Result<(), Error> {
    info!("Volunteers command triggered by {}", ctx.author().tag());
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };

    ctx.defer().await?;
    let platform = SerenityPlatform::new(ctx.serenity_context());
    let roster = match platform.roster(guild).await {
        Ok(roster) => roster,
        Err(e) => {
            error!("Could not fetch the members of {guild}: {e}");
            ctx.say(format!("Could not fetch the member list: {e}"))
                .await?;
            return Ok(());
        }
    };

    let data = ctx.data();
    for (title, crew) in [("Volunteers", Crew::Volunteers), ("Mentors", Crew::Mentors)] {
        let names = data.volunteers.names(crew);
        let rows = crew_status(&*data.status, &roster, names, crew).await;
        ctx.say(render_table(title, &rows)).await?;
    }

    Ok(())
}

/// Give every listed volunteer and mentor their role.
#[poise::command(
    rename = "assign-volunteers",
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn assign_volunteers(ctx: Context<'_>) -> Result<(), Error> {
    info!("Volunteer assignment triggered by {}", ctx.author().tag());
    let Some(guild) = ctx.guild_id() else {
        return Ok(());
    };

    let data = ctx.data();
    for crew in [Crew::Volunteers, Crew::Mentors] {
        if data.roles.get(crew.role()).is_none() {
            ctx.say(format!("The {} role is not configured.", crew.role()))
                .await?;
            return Ok(());
        }
    }

    ctx.defer().await?;
    let platform = SerenityPlatform::new(ctx.serenity_context());
    let roster = match platform.roster(guild).await {
        Ok(roster) => roster,
        Err(e) => {
            error!("Could not fetch the members of {guild}: {e}");
            ctx.say(format!("Could not fetch the member list: {e}"))
                .await?;
            return Ok(());
        }
    };

    let assigner = RoleAssigner::new(&platform, &data.roles);
    let mut lines = Vec::new();
    for crew in [Crew::Volunteers, Crew::Mentors] {
        let names = data.volunteers.names(crew);
        let result = assign_crew(&assigner, guild, &roster, names, crew).await;
        lines.push(format!(
            "Assigned the {} role to {} of {} members.",
            crew.role(),
            result.assigned,
            names.len()
        ));
        if !result.not_found.is_empty() {
            lines.push(format!("Not found: {}", result.not_found.iter().join(", ")));
        }
    }

    ctx.say(lines.join("\n")).await?;
    Ok(())
}
