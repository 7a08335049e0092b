use chrono::{DateTime, Utc};
use dh_core::announcement::AnnouncementTracker;
use dh_core::notices;
use dh_core::platform::{Platform, PlatformError};
use dh_core::reminders::ReminderLog;
use dh_core::roles::{RoleCatalog, RoleName};
use dh_core::structs::Data;
use poise::serenity_prelude::{GuildId, UserId};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How soon a pass is repeated when a guild's members could not be fetched.
pub const RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub sent: Vec<UserId>,
    pub failed: Vec<UserId>,
    /// Guilds missing one of the attendance roles.
    pub skipped_guilds: Vec<GuildId>,
    /// Guilds whose member list could not be fetched this pass.
    pub unavailable_guilds: Vec<GuildId>,
}

/// DMs accepted members who have not answered the announcement yet.
pub struct ReminderScheduler<'a> {
    platform: &'a dyn Platform,
    announcement: &'a AnnouncementTracker,
    roles: &'a RoleCatalog,
    log: &'a ReminderLog,
    interval: Duration,
    clock: &'a (dyn Fn() -> DateTime<Utc> + Sync),
}

impl<'a> ReminderScheduler<'a> {
    #[must_use]
    pub fn new(platform: &'a dyn Platform, data: &'a Data) -> Self {
        ReminderScheduler {
            platform,
            announcement: &data.announcement,
            roles: &data.roles,
            log: &data.reminders,
            interval: data.reminder_interval,
            clock: &Utc::now,
        }
    }

    /// Replaces the wall clock, read once before and once after every send.
    #[must_use]
    pub fn with_clock(mut self, clock: &'a (dyn Fn() -> DateTime<Utc> + Sync)) -> Self {
        self.clock = clock;
        self
    }

    /// One pass over every guild. Stops sending as soon as `cancel` fires.
    pub async fn tick(&self, cancel: &CancellationToken) -> TickReport {
        let mut report = TickReport::default();
        if self.announcement.current().is_none() {
            return report;
        }

        let accepted = self.roles.required(RoleName::Accepted);
        let attending = self.roles.required(RoleName::Attending);
        let withdrawn = self.roles.required(RoleName::Withdrawn);

        for guild in self.platform.guilds() {
            let roster = match self.platform.roster(guild).await {
                Ok(roster) => roster,
                Err(e) => {
                    warn!("Could not fetch the members of {guild}, retrying soon: {e}");
                    report.unavailable_guilds.push(guild);
                    continue;
                }
            };

            if ![accepted, attending, withdrawn]
                .iter()
                .all(|role| roster.roles.contains(role))
            {
                error!("Could not find all required roles in guild {guild}");
                report.skipped_guilds.push(guild);
                continue;
            }

            let silent = roster.members.iter().filter(|m| {
                m.has_role(accepted) && !m.has_role(attending) && !m.has_role(withdrawn)
            });

            for member in silent {
                if cancel.is_cancelled() {
                    info!("Reminder pass cancelled");
                    return report;
                }

                if !self.log.is_due(member.user, (self.clock)(), self.interval) {
                    continue;
                }

                match self
                    .platform
                    .direct_message(member.user, &notices::reminder())
                    .await
                {
                    Ok(()) => {
                        self.log.record(member.user, (self.clock)());
                        debug!("Sent reminder to {}", member.name);
                        report.sent.push(member.user);
                    }
                    Err(PlatformError::PermissionDenied) => {
                        error!("Cannot send DM to {} ({})", member.name, member.user);
                        report.failed.push(member.user);
                    }
                    Err(e) => {
                        error!("Error sending reminder to {} ({}): {e}", member.name, member.user);
                        report.failed.push(member.user);
                    }
                }
            }
        }

        report
    }
}

/// Spawns [`run`] the first time it is called, later calls do nothing.
///
/// Call it once the cache is ready so the first pass sees every guild.
pub fn start(platform: Arc<dyn Platform>, data: &Arc<Data>) -> bool {
    if data.reminders_started.swap(true, Ordering::AcqRel) {
        return false;
    }

    tokio::spawn(run(platform, Arc::clone(data)));
    true
}

/// Runs a reminder pass every interval until `data.shutdown` is cancelled.
///
/// The first pass runs immediately and the next one is timed from the end of the
/// previous pass. A pass that could not reach some guild is repeated after
/// [`RETRY_DELAY`] instead.
pub async fn run(platform: Arc<dyn Platform>, data: Arc<Data>) {
    run_with_clock(platform, data, Utc::now).await;
}

async fn run_with_clock(
    platform: Arc<dyn Platform>,
    data: Arc<Data>,
    clock: impl Fn() -> DateTime<Utc> + Send + Sync,
) {
    let cancel = data.shutdown.clone();

    info!(
        "Attendance reminders every {} minutes",
        data.reminder_interval.as_secs() / 60
    );

    while !cancel.is_cancelled() {
        let report = ReminderScheduler::new(&*platform, &data)
            .with_clock(&clock)
            .tick(&cancel)
            .await;
        if !report.sent.is_empty() || !report.failed.is_empty() {
            info!(
                "Reminder pass: {} sent, {} failed",
                report.sent.len(),
                report.failed.len()
            );
        }

        let wait = if report.unavailable_guilds.is_empty() {
            data.reminder_interval
        } else {
            RETRY_DELAY.min(data.reminder_interval)
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }
    }

    info!("Attendance reminders stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dh_core::testing::{FakePlatform, FakeStatusStore, data};
    use poise::serenity_prelude::{MessageId, RoleId};
    use std::sync::atomic::AtomicI64;

    const GUILD: GuildId = GuildId::new(1);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 14, 9, 0, 0).unwrap()
    }

    fn live_data() -> Data {
        let mut data = data(Arc::new(FakeStatusStore::new()));
        data.announcement = AnnouncementTracker::resume(MessageId::new(55));
        data
    }

    fn role(data: &Data, name: RoleName) -> RoleId {
        data.roles.get(name).unwrap()
    }

    async fn tick_at(platform: &FakePlatform, data: &Data, now: DateTime<Utc>) -> TickReport {
        let clock = move || now;
        ReminderScheduler::new(platform, data)
            .with_clock(&clock)
            .tick(&CancellationToken::new())
            .await
    }

    // Wall time that follows tokio's (possibly paused) clock.
    fn tokio_clock() -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
        let start = tokio::time::Instant::now();
        move || t0() + chrono::Duration::from_std(start.elapsed()).unwrap()
    }

    #[tokio::test]
    async fn ten_silent_members_get_ten_reminders() {
        let platform = FakePlatform::new();
        let data = live_data();
        for i in 0..10 {
            platform.add_member(
                GUILD,
                UserId::new(200 + i),
                &format!("member{i}"),
                &[role(&data, RoleName::Accepted)],
            );
        }

        let report = tick_at(&platform, &data, t0()).await;

        assert_eq!(report.sent.len(), 10);
        assert_eq!(platform.dms().len(), 10);
        assert_eq!(data.reminders.len(), 10);
    }

    #[tokio::test]
    async fn closed_dms_are_not_recorded() {
        let platform = FakePlatform::new();
        let data = live_data();
        let open = UserId::new(200);
        let closed = UserId::new(201);
        platform.add_member(GUILD, open, "open", &[role(&data, RoleName::Accepted)]);
        platform.add_member(GUILD, closed, "closed", &[role(&data, RoleName::Accepted)]);
        platform.block_dms(closed);

        let report = tick_at(&platform, &data, t0()).await;

        assert_eq!(report.sent, vec![open]);
        assert_eq!(report.failed, vec![closed]);
        assert_eq!(data.reminders.last_reminded(open), Some(t0()));
        assert_eq!(data.reminders.last_reminded(closed), None);
    }

    #[tokio::test]
    async fn only_silent_accepted_members_are_eligible() {
        let platform = FakePlatform::new();
        let data = live_data();
        let accepted = role(&data, RoleName::Accepted);
        platform.add_member(GUILD, UserId::new(200), "silent", &[accepted]);
        platform.add_member(
            GUILD,
            UserId::new(201),
            "coming",
            &[accepted, role(&data, RoleName::Attending)],
        );
        platform.add_member(
            GUILD,
            UserId::new(202),
            "not-coming",
            &[accepted, role(&data, RoleName::Withdrawn)],
        );
        platform.add_member(GUILD, UserId::new(203), "applicant", &[role(&data, RoleName::Applied)]);

        let report = tick_at(&platform, &data, t0()).await;

        assert_eq!(report.sent, vec![UserId::new(200)]);
    }

    #[tokio::test]
    async fn cooldown_holds_until_the_interval_has_passed() {
        let platform = FakePlatform::new();
        let data = live_data();
        platform.add_member(GUILD, UserId::new(200), "silent", &[role(&data, RoleName::Accepted)]);
        let interval = chrono::Duration::from_std(data.reminder_interval).unwrap();

        assert_eq!(tick_at(&platform, &data, t0()).await.sent.len(), 1);

        let early = t0() + interval - chrono::Duration::seconds(1);
        assert!(tick_at(&platform, &data, early).await.sent.is_empty());

        assert_eq!(tick_at(&platform, &data, t0() + interval).await.sent.len(), 1);
        assert_eq!(platform.dms().len(), 2);
    }

    #[tokio::test]
    async fn each_reminder_is_stamped_when_it_goes_out() {
        let platform = FakePlatform::new();
        let data = live_data();
        let (first, second) = (UserId::new(200), UserId::new(201));
        platform.add_member(GUILD, first, "first", &[role(&data, RoleName::Accepted)]);
        platform.add_member(GUILD, second, "second", &[role(&data, RoleName::Accepted)]);

        let reads = AtomicI64::new(0);
        let clock = || t0() + chrono::Duration::minutes(reads.fetch_add(1, Ordering::SeqCst));
        ReminderScheduler::new(&platform, &data)
            .with_clock(&clock)
            .tick(&CancellationToken::new())
            .await;

        let first_at = data.reminders.last_reminded(first).unwrap();
        let second_at = data.reminders.last_reminded(second).unwrap();
        assert!(first_at > t0());
        assert!(second_at > first_at);
    }

    #[tokio::test]
    async fn nothing_happens_without_an_announcement() {
        let platform = FakePlatform::new();
        let data = data(Arc::new(FakeStatusStore::new()));
        platform.add_member(GUILD, UserId::new(200), "silent", &[role(&data, RoleName::Accepted)]);

        let report = tick_at(&platform, &data, t0()).await;

        assert_eq!(report, TickReport::default());
        assert!(platform.dms().is_empty());
    }

    #[tokio::test]
    async fn guilds_missing_roles_are_skipped_alone() {
        let platform = FakePlatform::new();
        let data = live_data();
        let broken = GuildId::new(2);
        platform.add_member(GUILD, UserId::new(200), "a", &[role(&data, RoleName::Accepted)]);
        platform.add_member(broken, UserId::new(300), "b", &[role(&data, RoleName::Accepted)]);
        platform.delete_guild_role(broken, role(&data, RoleName::Withdrawn));

        let report = tick_at(&platform, &data, t0()).await;

        assert_eq!(report.skipped_guilds, vec![broken]);
        assert_eq!(report.sent, vec![UserId::new(200)]);
    }

    #[tokio::test]
    async fn unreachable_members_are_reported() {
        let platform = FakePlatform::new();
        let data = live_data();
        platform.add_member(GUILD, UserId::new(200), "a", &[role(&data, RoleName::Accepted)]);
        platform.fail_rosters(1);

        let report = tick_at(&platform, &data, t0()).await;

        assert_eq!(report.unavailable_guilds, vec![GUILD]);
        assert!(report.sent.is_empty());
    }

    #[tokio::test]
    async fn cancelled_pass_sends_nothing_further() {
        let platform = FakePlatform::new();
        let data = live_data();
        platform.add_member(GUILD, UserId::new(200), "a", &[role(&data, RoleName::Accepted)]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = ReminderScheduler::new(&platform, &data).tick(&cancel).await;

        assert!(report.sent.is_empty());
        assert!(data.reminders.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_passes_again_after_each_interval() {
        let platform = Arc::new(FakePlatform::new());
        let data = Arc::new(live_data());
        platform.add_member(GUILD, UserId::new(200), "silent", &[role(&data, RoleName::Accepted)]);
        let interval = data.reminder_interval;

        let task = tokio::spawn(run_with_clock(platform.clone(), data.clone(), tokio_clock()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(platform.dms().len(), 1);

        tokio::time::sleep(interval - Duration::from_secs(2)).await;
        assert_eq!(platform.dms().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(platform.dms().len(), 2);

        data.shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_guilds_are_retried_before_the_next_interval() {
        let platform = Arc::new(FakePlatform::new());
        let data = Arc::new(live_data());
        platform.add_member(GUILD, UserId::new(200), "silent", &[role(&data, RoleName::Accepted)]);
        platform.fail_rosters(1);
        assert!(RETRY_DELAY < data.reminder_interval);

        let task = tokio::spawn(run_with_clock(platform.clone(), data.clone(), tokio_clock()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(platform.dms().is_empty());

        tokio::time::sleep(RETRY_DELAY).await;
        assert_eq!(platform.dms().len(), 1);

        data.shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_pass_stops_the_remaining_reminders() {
        let platform = Arc::new(FakePlatform::new());
        let data = Arc::new(live_data());
        for i in 0..5 {
            platform.add_member(
                GUILD,
                UserId::new(200 + i),
                &format!("member{i}"),
                &[role(&data, RoleName::Accepted)],
            );
        }
        platform.cancel_after_dms(2, data.shutdown.clone());

        let task = tokio::spawn(run_with_clock(platform.clone(), data.clone(), tokio_clock()));
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("reminder loop ignored shutdown")
            .unwrap();

        assert_eq!(platform.dms().len(), 2);
        assert_eq!(data.reminders.len(), 2);
    }

    #[tokio::test]
    async fn the_loop_is_started_once() {
        let platform: Arc<dyn Platform> = Arc::new(FakePlatform::new());
        let data = Arc::new(live_data());

        assert!(start(platform.clone(), &data));
        assert!(!start(platform, &data));

        data.shutdown.cancel();
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let platform: Arc<dyn Platform> = Arc::new(FakePlatform::new());
        let data = Arc::new(live_data());
        data.shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), run(platform, data))
            .await
            .expect("reminder loop ignored shutdown");
    }
}
