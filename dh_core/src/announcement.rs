use crate::platform::{Notice, Platform, PlatformError};
use parking_lot::RwLock;
use poise::serenity_prelude::{ChannelId, MessageId, ReactionType};
use tracing::{error, info};

/// The two answers a member can give on the announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Confirm,
    Withdraw,
}

impl ReactionKind {
    /// In the order they are attached to the announcement.
    pub const ALL: [ReactionKind; 2] = [ReactionKind::Confirm, ReactionKind::Withdraw];

    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            ReactionKind::Confirm => "✅",
            ReactionKind::Withdraw => "❌",
        }
    }

    #[must_use]
    pub fn reaction(self) -> ReactionType {
        ReactionType::Unicode(self.emoji().to_owned())
    }

    #[must_use]
    pub fn role(self) -> crate::roles::RoleName {
        match self {
            ReactionKind::Confirm => crate::roles::RoleName::Attending,
            ReactionKind::Withdraw => crate::roles::RoleName::Withdrawn,
        }
    }

    #[must_use]
    pub fn from_reaction(reaction: &ReactionType) -> Option<Self> {
        match reaction {
            ReactionType::Unicode(emoji) => {
                ReactionKind::ALL.into_iter().find(|k| k.emoji() == emoji)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnouncementState {
    #[default]
    Empty,
    /// An `announce` is mid-flight, holds the slot across the send.
    Creating,
    Live(MessageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Created(MessageId),
    AlreadyActive,
}

/// Owns the single attendance announcement.
#[derive(Debug, Default)]
pub struct AnnouncementTracker {
    state: RwLock<AnnouncementState>,
}

impl AnnouncementTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks tracking back up for an announcement posted before a restart.
    #[must_use]
    pub fn resume(message: MessageId) -> Self {
        AnnouncementTracker {
            state: RwLock::new(AnnouncementState::Live(message)),
        }
    }

    #[must_use]
    pub fn state(&self) -> AnnouncementState {
        *self.state.read()
    }

    /// The live announcement, if there is one.
    #[must_use]
    pub fn current(&self) -> Option<MessageId> {
        match *self.state.read() {
            AnnouncementState::Live(message) => Some(message),
            _ => None,
        }
    }

    /// Posts the announcement into `channel` and attaches the reactions.
    ///
    /// Does nothing if an announcement is already live or being posted. A failed
    /// send frees the slot again, a failed reaction does not.
    pub async fn create(
        &self,
        platform: &dyn Platform,
        channel: ChannelId,
        render: impl FnOnce() -> Notice + Send,
    ) -> Result<AnnounceOutcome, PlatformError> {
        {
            let mut state = self.state.write();
            if *state != AnnouncementState::Empty {
                return Ok(AnnounceOutcome::AlreadyActive);
            }
            *state = AnnouncementState::Creating;
        }

        let message = match platform.send_notice(channel, &render()).await {
            Ok(message) => message,
            Err(e) => {
                error!("Could not post the attendance announcement in {channel}: {e}");
                *self.state.write() = AnnouncementState::Empty;
                return Err(e);
            }
        };

        *self.state.write() = AnnouncementState::Live(message);
        info!("Attendance announcement {message} posted in {channel}.");

        for kind in ReactionKind::ALL {
            if let Err(e) = platform
                .add_reaction(channel, message, &kind.reaction())
                .await
            {
                error!("Could not add {} to announcement {message}: {e}", kind.emoji());
            }
        }

        Ok(AnnounceOutcome::Created(message))
    }

    /// Stops tracking the live announcement, returning it.
    ///
    /// Reactions on a closed announcement are ignored and no reminders go out.
    pub fn close(&self) -> Option<MessageId> {
        let mut state = self.state.write();
        match *state {
            AnnouncementState::Live(message) => {
                *state = AnnouncementState::Empty;
                Some(message)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlatform;
    use poise::serenity_prelude::Colour;

    const CHANNEL: ChannelId = ChannelId::new(77);

    fn notice() -> Notice {
        Notice::new("Attendance Confirmation", "react below", Colour::new(0x00ff00))
    }

    #[tokio::test]
    async fn create_posts_and_attaches_reactions_in_order() {
        let platform = FakePlatform::new();
        let tracker = AnnouncementTracker::new();

        let outcome = tracker.create(&platform, CHANNEL, notice).await.unwrap();
        let AnnounceOutcome::Created(message) = outcome else {
            panic!("expected a new announcement, got {outcome:?}");
        };

        assert_eq!(tracker.current(), Some(message));
        assert_eq!(platform.sent_notices().len(), 1);
        let reactions: Vec<_> = platform
            .message_reactions(message)
            .into_iter()
            .map(|r| r.emoji)
            .collect();
        assert_eq!(
            reactions,
            vec![ReactionKind::Confirm.reaction(), ReactionKind::Withdraw.reaction()]
        );
    }

    #[tokio::test]
    async fn second_create_is_rejected_without_side_effects() {
        let platform = FakePlatform::new();
        let tracker = AnnouncementTracker::new();
        tracker.create(&platform, CHANNEL, notice).await.unwrap();
        let before = tracker.state();
        let reactions_before = platform.reaction_adds();

        let outcome = tracker.create(&platform, CHANNEL, notice).await.unwrap();

        assert_eq!(outcome, AnnounceOutcome::AlreadyActive);
        assert_eq!(tracker.state(), before);
        assert_eq!(platform.sent_notices().len(), 1);
        assert_eq!(platform.reaction_adds(), reactions_before);
    }

    #[tokio::test]
    async fn failed_send_frees_the_slot() {
        let platform = FakePlatform::new();
        platform.fail_sends();
        let tracker = AnnouncementTracker::new();

        assert!(tracker.create(&platform, CHANNEL, notice).await.is_err());
        assert_eq!(tracker.state(), AnnouncementState::Empty);
    }

    #[tokio::test]
    async fn resumed_announcement_blocks_new_ones_until_closed() {
        let platform = FakePlatform::new();
        let tracker = AnnouncementTracker::resume(MessageId::new(42));

        let outcome = tracker.create(&platform, CHANNEL, notice).await.unwrap();
        assert_eq!(outcome, AnnounceOutcome::AlreadyActive);

        assert_eq!(tracker.close(), Some(MessageId::new(42)));
        assert_eq!(tracker.current(), None);
        assert_eq!(tracker.close(), None);

        let outcome = tracker.create(&platform, CHANNEL, notice).await.unwrap();
        assert!(matches!(outcome, AnnounceOutcome::Created(_)));
    }

    #[test]
    fn reactions_map_onto_kinds() {
        assert_eq!(
            ReactionKind::from_reaction(&ReactionType::Unicode("✅".into())),
            Some(ReactionKind::Confirm)
        );
        assert_eq!(
            ReactionKind::from_reaction(&ReactionType::Unicode("🎉".into())),
            None
        );
        assert_eq!(ReactionKind::Withdraw.role(), crate::roles::RoleName::Withdrawn);
    }
}
