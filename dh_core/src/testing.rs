//! In-memory stand-ins for Discord and the dashboard database.

use crate::announcement::AnnouncementTracker;
use crate::config::DEFAULT_REMINDER_INTERVAL;
use crate::platform::{GuildRoster, Notice, Platform, PlatformError, ReactionUsers, RosterMember};
use crate::reminders::ReminderLog;
use crate::roles::{RoleCatalog, RoleName};
use crate::status::StatusStore;
use crate::structs::{Data, Error};
use crate::volunteers::VolunteerRoster;
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, ReactionType, RoleId, UserId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// The fake bot's own id.
pub const BOT: UserId = UserId::new(1);

/// Every role mapped to `100 + index` except `mentor`, which is left unconfigured.
#[must_use]
pub fn catalog() -> RoleCatalog {
    let roles = RoleName::ALL
        .into_iter()
        .enumerate()
        .filter(|(_, name)| *name != RoleName::Mentor)
        .map(|(i, name)| (name, RoleId::new(100 + i as u64)))
        .collect();
    RoleCatalog::new(roles).unwrap()
}

/// Bot state with no announcement, default interval and the given store.
#[must_use]
pub fn data(status: Arc<FakeStatusStore>) -> Data {
    Data {
        prefix: "dh.".to_owned(),
        roles: catalog(),
        announcement: AnnouncementTracker::new(),
        reminders: ReminderLog::new(),
        reminder_interval: DEFAULT_REMINDER_INTERVAL,
        status,
        volunteers: VolunteerRoster::default(),
        shutdown: CancellationToken::new(),
        reminders_started: AtomicBool::new(false),
    }
}

/// A reaction the fake took away, the gateway would echo it as a remove event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedReaction {
    pub channel: ChannelId,
    pub message: MessageId,
    pub user: UserId,
    pub emoji: ReactionType,
}

#[derive(Default)]
struct FakeGuild {
    roles: HashSet<RoleId>,
    members: BTreeMap<UserId, (String, Option<u16>, BTreeSet<RoleId>)>,
}

#[derive(Default)]
struct State {
    guilds: BTreeMap<GuildId, FakeGuild>,
    messages: BTreeMap<MessageId, Vec<ReactionUsers>>,
    next_message: u64,
    notices: Vec<(ChannelId, Notice)>,
    dms: Vec<(UserId, Notice)>,
    removed: Vec<RemovedReaction>,
    blocked_dms: HashSet<UserId>,
    denied_role_edits: HashSet<UserId>,
    role_mutations: usize,
    reaction_adds: usize,
    fail_sends: bool,
    deny_reaction_removal: bool,
    failing_rosters: usize,
    cancel_after_dms: Option<(usize, CancellationToken)>,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    #[must_use]
    pub fn new() -> Self {
        FakePlatform {
            state: Mutex::new(State {
                next_message: 1000,
                ..State::default()
            }),
        }
    }

    /// Adds a member, creating the guild with every [`catalog`] role on first use.
    pub fn add_member(&self, guild: GuildId, user: UserId, name: &str, roles: &[RoleId]) {
        let mut state = self.state.lock();
        let guild = state.guilds.entry(guild).or_insert_with(|| FakeGuild {
            roles: RoleName::ALL
                .into_iter()
                .filter_map(|name| catalog().get(name))
                .collect(),
            members: BTreeMap::new(),
        });
        guild.members.insert(
            user,
            (name.to_owned(), None, roles.iter().copied().collect()),
        );
    }

    pub fn set_discriminator(&self, guild: GuildId, user: UserId, discriminator: u16) {
        if let Some((_, d, _)) = self
            .state
            .lock()
            .guilds
            .get_mut(&guild)
            .and_then(|g| g.members.get_mut(&user))
        {
            *d = Some(discriminator);
        }
    }

    pub fn delete_guild_role(&self, guild: GuildId, role: RoleId) {
        if let Some(guild) = self.state.lock().guilds.get_mut(&guild) {
            guild.roles.remove(&role);
        }
    }

    #[must_use]
    pub fn member_roles(&self, guild: GuildId, user: UserId) -> Vec<RoleId> {
        self.state
            .lock()
            .guilds
            .get(&guild)
            .and_then(|g| g.members.get(&user))
            .map(|(_, _, roles)| roles.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn deny_role_edits(&self, user: UserId) {
        self.state.lock().denied_role_edits.insert(user);
    }

    pub fn block_dms(&self, user: UserId) {
        self.state.lock().blocked_dms.insert(user);
    }

    pub fn fail_sends(&self) {
        self.state.lock().fail_sends = true;
    }

    pub fn deny_reaction_removal(&self) {
        self.state.lock().deny_reaction_removal = true;
    }

    /// The next `count` roster requests fail as if Discord was unreachable.
    pub fn fail_rosters(&self, count: usize) {
        self.state.lock().failing_rosters = count;
    }

    /// Cancels `token` once `count` DMs in total have gone out.
    pub fn cancel_after_dms(&self, count: usize, token: CancellationToken) {
        self.state.lock().cancel_after_dms = Some((count, token));
    }

    /// Places a reaction as `user` would in the client.
    pub fn react(&self, message: MessageId, user: UserId, emoji: &ReactionType) {
        let mut state = self.state.lock();
        let reactions = state.messages.entry(message).or_default();
        push_reaction(reactions, user, emoji);
    }

    /// Takes a reaction away as `user` would in the client.
    pub fn unreact(&self, message: MessageId, user: UserId, emoji: &ReactionType) {
        let mut state = self.state.lock();
        if let Some(reactions) = state.messages.get_mut(&message) {
            pull_reaction(reactions, user, emoji);
        }
    }

    #[must_use]
    pub fn message_reactions(&self, message: MessageId) -> Vec<ReactionUsers> {
        self.state
            .lock()
            .messages
            .get(&message)
            .cloned()
            .unwrap_or_default()
    }

    /// Reactions removed by the bot since the last call.
    pub fn take_removed(&self) -> Vec<RemovedReaction> {
        std::mem::take(&mut self.state.lock().removed)
    }

    #[must_use]
    pub fn sent_notices(&self) -> Vec<(ChannelId, Notice)> {
        self.state.lock().notices.clone()
    }

    #[must_use]
    pub fn dms(&self) -> Vec<(UserId, Notice)> {
        self.state.lock().dms.clone()
    }

    #[must_use]
    pub fn role_mutations(&self) -> usize {
        self.state.lock().role_mutations
    }

    #[must_use]
    pub fn reaction_adds(&self) -> usize {
        self.state.lock().reaction_adds
    }

    fn edit_roles(
        &self,
        guild: GuildId,
        user: UserId,
        edit: impl FnOnce(&mut BTreeSet<RoleId>),
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.role_mutations += 1;
        if state.denied_role_edits.contains(&user) {
            return Err(PlatformError::PermissionDenied);
        }

        let (_, _, roles) = state
            .guilds
            .get_mut(&guild)
            .and_then(|g| g.members.get_mut(&user))
            .ok_or(PlatformError::NotFound)?;
        edit(roles);
        Ok(())
    }
}

fn push_reaction(reactions: &mut Vec<ReactionUsers>, user: UserId, emoji: &ReactionType) {
    match reactions.iter_mut().find(|r| r.emoji == *emoji) {
        Some(reaction) if !reaction.users.contains(&user) => reaction.users.push(user),
        Some(_) => {}
        None => reactions.push(ReactionUsers {
            emoji: emoji.clone(),
            users: vec![user],
        }),
    }
}

fn pull_reaction(reactions: &mut Vec<ReactionUsers>, user: UserId, emoji: &ReactionType) -> bool {
    let Some(reaction) = reactions.iter_mut().find(|r| r.emoji == *emoji) else {
        return false;
    };
    let before = reaction.users.len();
    reaction.users.retain(|u| *u != user);
    let removed = reaction.users.len() != before;
    reactions.retain(|r| !r.users.is_empty());
    removed
}

#[serenity::async_trait]
impl Platform for FakePlatform {
    fn current_user(&self) -> UserId {
        BOT
    }

    async fn send_notice(
        &self,
        channel: ChannelId,
        notice: &Notice,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(PlatformError::Transient("send failed".to_owned()));
        }

        state.next_message += 1;
        let message = MessageId::new(state.next_message);
        state.messages.insert(message, Vec::new());
        state.notices.push((channel, notice.clone()));
        Ok(message)
    }

    async fn add_reaction(
        &self,
        _channel: ChannelId,
        message: MessageId,
        emoji: &ReactionType,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.reaction_adds += 1;
        let reactions = state
            .messages
            .get_mut(&message)
            .ok_or(PlatformError::NotFound)?;
        push_reaction(reactions, BOT, emoji);
        Ok(())
    }

    async fn reactions(
        &self,
        _channel: ChannelId,
        message: MessageId,
    ) -> Result<Vec<ReactionUsers>, PlatformError> {
        self.state
            .lock()
            .messages
            .get(&message)
            .cloned()
            .ok_or(PlatformError::NotFound)
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &ReactionType,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.deny_reaction_removal {
            return Err(PlatformError::PermissionDenied);
        }

        let reactions = state
            .messages
            .get_mut(&message)
            .ok_or(PlatformError::NotFound)?;
        if pull_reaction(reactions, user, emoji) {
            state.removed.push(RemovedReaction {
                channel,
                message,
                user,
                emoji: emoji.clone(),
            });
        }
        Ok(())
    }

    async fn add_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.edit_roles(guild, user, |roles| {
            roles.insert(role);
        })
    }

    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.edit_roles(guild, user, |roles| {
            roles.remove(&role);
        })
    }

    async fn set_member_roles(
        &self,
        guild: GuildId,
        user: UserId,
        new_roles: &[RoleId],
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.edit_roles(guild, user, |roles| {
            *roles = new_roles.iter().copied().collect();
        })
    }

    fn guilds(&self) -> Vec<GuildId> {
        self.state.lock().guilds.keys().copied().collect()
    }

    fn is_member(&self, guild: GuildId, user: UserId) -> bool {
        self.state
            .lock()
            .guilds
            .get(&guild)
            .is_some_and(|g| g.members.contains_key(&user))
    }

    async fn roster(&self, guild: GuildId) -> Result<GuildRoster, PlatformError> {
        let mut state = self.state.lock();
        if state.failing_rosters > 0 {
            state.failing_rosters -= 1;
            return Err(PlatformError::Transient("roster unavailable".to_owned()));
        }

        let guild = state.guilds.get(&guild).ok_or(PlatformError::NotFound)?;
        Ok(GuildRoster {
            roles: guild.roles.clone(),
            members: guild
                .members
                .iter()
                .map(|(user, (name, discriminator, roles))| RosterMember {
                    user: *user,
                    name: name.clone(),
                    discriminator: *discriminator,
                    roles: roles.iter().copied().collect(),
                })
                .collect(),
        })
    }

    async fn direct_message(&self, user: UserId, notice: &Notice) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.blocked_dms.contains(&user) {
            return Err(PlatformError::PermissionDenied);
        }
        state.dms.push((user, notice.clone()));
        if let Some((count, token)) = &state.cancel_after_dms {
            if state.dms.len() >= *count {
                token.cancel();
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStatusStore {
    statuses: Mutex<HashMap<UserId, String>>,
    emails: Mutex<HashMap<UserId, String>>,
    usernames: Mutex<HashSet<String>>,
}

impl FakeStatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, user: UserId, status: &str) {
        self.statuses.lock().insert(user, status.to_owned());
    }

    pub fn set_email(&self, user: UserId, email: &str) {
        self.emails.lock().insert(user, email.to_owned());
    }

    pub fn add_username(&self, username: &str) {
        self.usernames.lock().insert(username.to_owned());
    }
}

#[serenity::async_trait]
impl StatusStore for FakeStatusStore {
    async fn fetch_status(&self, user: UserId) -> Result<Option<String>, Error> {
        Ok(self.statuses.lock().get(&user).cloned())
    }

    async fn fetch_email(&self, user: UserId) -> Result<Option<String>, Error> {
        Ok(self.emails.lock().get(&user).cloned())
    }

    async fn has_username(&self, username: &str) -> Result<bool, Error> {
        Ok(self.usernames.lock().contains(username))
    }
}
