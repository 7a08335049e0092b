use poise::serenity_prelude::MessageId;
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

use crate::roles::{RoleCatalog, RoleName};

/// Four hours, how long a member is left alone after a reminder.
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable `{0}`")]
    MissingVar(&'static str),
    #[error("no role id configured for the required role `{0}`")]
    MissingRole(RoleName),
    #[error("`{key}` is not a valid id: {value:?}")]
    InvalidId { key: String, value: String },
    #[error("`{key}` is not a valid number: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// Where the status database lives.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        user: String,
        password: String,
        database: String,
    },
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        Ok(match self {
            DatabaseConfig::Url(url) => url.parse()?,
            DatabaseConfig::Parts {
                host,
                user,
                password,
                database,
            } => PgConnectOptions::new()
                .host(host)
                .username(user)
                .password(password)
                .database(database),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub prefix: String,
    pub database: DatabaseConfig,
    pub roles: RoleCatalog,
    /// Announcement to keep tracking after a restart.
    pub announcement: Option<MessageId>,
    pub reminder_interval: Duration,
    pub volunteers_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |key: &'static str| lookup(key).ok_or(ConfigError::MissingVar(key));

        let database = match lookup("DATABASE_URL") {
            Some(url) => DatabaseConfig::Url(url),
            None => DatabaseConfig::Parts {
                host: require("DB_HOST")?,
                user: require("DB_USER")?,
                password: require("DB_PASS")?,
                database: require("DB_NAME")?,
            },
        };

        let announcement = lookup("ANNOUNCEMENT_MSG_ID").and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(id) if id != 0 => {
                    tracing::debug!("Loaded announcement message id {id}");
                    Some(MessageId::new(id))
                }
                _ => {
                    tracing::error!("ANNOUNCEMENT_MSG_ID is not a valid id ({raw:?}), ignoring it.");
                    None
                }
            }
        });

        let reminder_interval = match lookup("REMINDER_INTERVAL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        key: "REMINDER_INTERVAL_SECS",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_REMINDER_INTERVAL,
        };

        Ok(Config {
            token: require("DISCORD_TOKEN")?,
            prefix: lookup("PREFIX").unwrap_or_else(|| "dh.".to_owned()),
            database,
            roles: RoleCatalog::from_lookup(&lookup)?,
            announcement,
            reminder_interval,
            volunteers_path: lookup("VOLUNTEERS_CONFIG")
                .unwrap_or_else(|| "volunteers.json".to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DISCORD_TOKEN", "token"),
            ("DATABASE_URL", "postgres://localhost/deerhacks"),
            ("ACCEPTED_ROLE_ID", "10"),
            ("ATTENDING_ROLE_ID", "11"),
            ("WITHDRAWN_ROLE_ID", "12"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()))
    }

    #[test]
    fn defaults_apply() {
        let config = load(&base()).unwrap();
        assert_eq!(config.prefix, "dh.");
        assert_eq!(config.reminder_interval, DEFAULT_REMINDER_INTERVAL);
        assert_eq!(config.announcement, None);
        assert_eq!(config.volunteers_path, "volunteers.json");
    }

    #[test]
    fn invalid_announcement_id_is_ignored() {
        let mut vars = base();
        vars.insert("ANNOUNCEMENT_MSG_ID", "not-a-number");
        assert_eq!(load(&vars).unwrap().announcement, None);

        vars.insert("ANNOUNCEMENT_MSG_ID", "1234");
        assert_eq!(load(&vars).unwrap().announcement, Some(MessageId::new(1234)));
    }

    #[test]
    fn database_parts_are_required_without_url() {
        let mut vars = base();
        vars.remove("DATABASE_URL");
        vars.insert("DB_HOST", "localhost");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingVar("DB_USER"))
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut vars = base();
        vars.insert("REMINDER_INTERVAL_SECS", "0");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
