use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::UserId;
use std::time::Duration;

/// When each member was last sent an attendance reminder.
///
/// Lives for the whole process, entries are never evicted.
#[derive(Debug, Default)]
pub struct ReminderLog {
    last: DashMap<UserId, DateTime<Utc>>,
}

impl ReminderLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_reminded(&self, user: UserId) -> Option<DateTime<Utc>> {
        self.last.get(&user).map(|at| *at)
    }

    /// True if `user` was never reminded or at least `interval` has passed since.
    ///
    /// A clock that went backwards counts as not elapsed.
    #[must_use]
    pub fn is_due(&self, user: UserId, now: DateTime<Utc>, interval: Duration) -> bool {
        let Some(last) = self.last_reminded(user) else {
            return true;
        };

        (now - last)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= interval)
    }

    pub fn record(&self, user: UserId, at: DateTime<Utc>) {
        self.last.insert(user, at);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.last.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
