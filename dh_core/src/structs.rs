pub type Error = Box<dyn std::error::Error + Send + Sync>;
// Shared as an `Arc` so the reminder loop can outlive a single event.
pub type Context<'a> = poise::Context<'a, Arc<Data>, Error>;
pub type FrameworkContext<'a> = poise::FrameworkContext<'a, Arc<Data>, Error>;
pub type Command = poise::Command<Arc<Data>, Error>;

use crate::announcement::AnnouncementTracker;
use crate::config::Config;
use crate::reminders::ReminderLog;
use crate::roles::RoleCatalog;
use crate::status::StatusStore;
use crate::volunteers::VolunteerRoster;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct Data {
    pub prefix: String,
    pub roles: RoleCatalog,
    pub announcement: AnnouncementTracker,
    pub reminders: ReminderLog,
    pub reminder_interval: Duration,
    pub status: Arc<dyn StatusStore>,
    pub volunteers: VolunteerRoster,
    /// Cancelled on shutdown, stops the reminder loop.
    pub shutdown: CancellationToken,
    /// Set once the reminder loop has been spawned.
    pub reminders_started: AtomicBool,
}

impl Data {
    #[must_use]
    pub fn new(config: &Config, status: Arc<dyn StatusStore>, shutdown: CancellationToken) -> Self {
        let announcement = match config.announcement {
            Some(message) => AnnouncementTracker::resume(message),
            None => AnnouncementTracker::new(),
        };

        Data {
            prefix: config.prefix.clone(),
            roles: config.roles.clone(),
            announcement,
            reminders: ReminderLog::new(),
            reminder_interval: config.reminder_interval,
            status,
            volunteers: VolunteerRoster::load(&config.volunteers_path),
            shutdown,
            reminders_started: AtomicBool::new(false),
        }
    }
}
