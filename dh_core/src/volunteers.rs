use crate::assign::RoleAssigner;
use crate::platform::{GuildRoster, RosterMember};
use crate::roles::RoleName;
use crate::status::StatusStore;
use poise::serenity_prelude::{GuildId, UserId};
use serde::Deserialize;
use std::fmt::Write;
use tracing::{error, info};

/// Volunteer and mentor usernames, kept outside the dashboard.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
pub struct VolunteerRoster {
    #[serde(default)]
    pub volunteers: Vec<String>,
    #[serde(default)]
    pub mentors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crew {
    Volunteers,
    Mentors,
}

impl Crew {
    #[must_use]
    pub fn role(self) -> RoleName {
        match self {
            Crew::Volunteers => RoleName::Volunteer,
            Crew::Mentors => RoleName::Mentor,
        }
    }
}

impl VolunteerRoster {
    /// Reads the roster, an unreadable file yields an empty roster.
    #[must_use]
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match Self::parse(&raw) {
                Ok(roster) => {
                    info!("Loaded volunteers and mentors from {path}");
                    roster
                }
                Err(e) => {
                    error!("Error loading config file ({path}): {e}");
                    Self::default()
                }
            },
            Err(e) => {
                error!("Error loading config file ({path}): {e}");
                Self::default()
            }
        }
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    #[must_use]
    pub fn names(&self, crew: Crew) -> &[String] {
        match crew {
            Crew::Volunteers => &self.volunteers,
            Crew::Mentors => &self.mentors,
        }
    }
}

/// Finds a listed name in the guild.
///
/// Mentors listed as `name#1234` must match the full tag (`name#0` for migrated
/// accounts), everything else matches the username alone.
#[must_use]
pub fn find_member<'a>(roster: &'a GuildRoster, name: &str, crew: Crew) -> Option<&'a RosterMember> {
    let full_match = crew == Crew::Mentors && name.contains('#');
    roster.members.iter().find(|member| {
        if full_match {
            member.tag() == name
        } else {
            member.name == name
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewStatus {
    pub name: String,
    pub user: Option<UserId>,
    pub signed_up: bool,
}

/// Whether each listed person joined the guild and signed up on the dashboard.
pub async fn crew_status(
    store: &dyn StatusStore,
    roster: &GuildRoster,
    names: &[String],
    crew: Crew,
) -> Vec<CrewStatus> {
    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let user = find_member(roster, name, crew).map(|m| m.user);
        let signed_up = match user {
            Some(user) => store.fetch_email(user).await.map(|e| e.is_some()),
            None => store.has_username(name).await,
        }
        .unwrap_or_else(|e| {
            error!("Error querying database for {name}: {e}");
            false
        });

        rows.push(CrewStatus {
            name: name.clone(),
            user,
            signed_up,
        });
    }
    rows
}

#[must_use]
pub fn render_table(title: &str, rows: &[CrewStatus]) -> String {
    let yes_no = |b: bool| if b { "Yes" } else { "No" };

    let mut table = format!("{title}\n```");
    table.push_str(
        "| Discord Username         | Discord User ID       | Joined Server | Signed Up on DH |\n",
    );
    table.push_str(
        "|--------------------------|-----------------------|---------------|-----------------|\n",
    );
    for row in rows {
        let id = row.user.map_or_else(|| "N/A".to_owned(), |u| u.to_string());
        writeln!(
            table,
            "| {:24} | {:21} | {:13} | {:15} |",
            row.name,
            id,
            yes_no(row.user.is_some()),
            yes_no(row.signed_up)
        )
        .unwrap();
    }
    table.push_str("```");
    table
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrewAssignment {
    pub assigned: usize,
    pub not_found: Vec<String>,
}

/// Grants the crew's role to every listed member found in the guild.
pub async fn assign_crew(
    assigner: &RoleAssigner<'_>,
    guild: GuildId,
    roster: &GuildRoster,
    names: &[String],
    crew: Crew,
) -> CrewAssignment {
    let mut result = CrewAssignment::default();
    for name in names {
        let Some(member) = find_member(roster, name, crew) else {
            result.not_found.push(name.clone());
            continue;
        };

        if assigner
            .assign(guild, member.user, crew.role(), "Listed in the volunteer roster")
            .await
            .is_ok()
        {
            info!("Assigned {} role to {name}", crew.role());
            result.assigned += 1;
        }
    }
    result
}
