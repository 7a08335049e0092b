use poise::serenity_prelude::RoleId;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Logical roles the bot knows about, independent of any guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleName {
    Pending,
    Registering,
    Applied,
    Selected,
    Accepted,
    Attending,
    Withdrawn,
    Attended,
    Volunteer,
    Mentor,
}

impl RoleName {
    pub const ALL: [RoleName; 10] = [
        RoleName::Pending,
        RoleName::Registering,
        RoleName::Applied,
        RoleName::Selected,
        RoleName::Accepted,
        RoleName::Attending,
        RoleName::Withdrawn,
        RoleName::Attended,
        RoleName::Volunteer,
        RoleName::Mentor,
    ];

    /// Roles the attendance flow cannot run without.
    pub const REQUIRED: [RoleName; 3] =
        [RoleName::Accepted, RoleName::Attending, RoleName::Withdrawn];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RoleName::Pending => "pending",
            RoleName::Registering => "registering",
            RoleName::Applied => "applied",
            RoleName::Selected => "selected",
            RoleName::Accepted => "accepted",
            RoleName::Attending => "attending",
            RoleName::Withdrawn => "withdrawn",
            RoleName::Attended => "attended",
            RoleName::Volunteer => "volunteer",
            RoleName::Mentor => "mentor",
        }
    }

    /// The environment variable holding this role's id, e.g. `ACCEPTED_ROLE_ID`.
    #[must_use]
    pub fn env_key(self) -> String {
        format!("{}_ROLE_ID", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a known role")]
pub struct UnknownRoleName(pub String);

impl FromStr for RoleName {
    type Err = UnknownRoleName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRoleName(s.to_owned()))
    }
}

/// Maps [`RoleName`]s onto the guild's actual role ids.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: HashMap<RoleName, RoleId>,
}

impl RoleCatalog {
    /// Builds a catalog, failing if any of [`RoleName::REQUIRED`] is missing.
    pub fn new(roles: HashMap<RoleName, RoleId>) -> Result<Self, ConfigError> {
        if let Some(missing) = RoleName::REQUIRED
            .into_iter()
            .find(|name| !roles.contains_key(name))
        {
            return Err(ConfigError::MissingRole(missing));
        }

        Ok(RoleCatalog { roles })
    }

    /// Reads every `<NAME>_ROLE_ID` through `lookup`.
    ///
    /// Unset optional roles are skipped, unparsable ids are always an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut roles = HashMap::new();
        for name in RoleName::ALL {
            let key = name.env_key();
            let Some(raw) = lookup(&key) else {
                continue;
            };

            let id = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|id| *id != 0)
                .ok_or(ConfigError::InvalidId { key, value: raw })?;
            roles.insert(name, RoleId::new(id));
        }

        RoleCatalog::new(roles)
    }

    #[must_use]
    pub fn get(&self, name: RoleName) -> Option<RoleId> {
        self.roles.get(&name).copied()
    }

    /// Only valid for [`RoleName::REQUIRED`], which [`RoleCatalog::new`] guarantees.
    #[must_use]
    pub fn required(&self, name: RoleName) -> RoleId {
        debug_assert!(RoleName::REQUIRED.contains(&name));
        self.roles[&name]
    }

    #[must_use]
    pub fn name_of(&self, id: RoleId) -> Option<RoleName> {
        self.roles
            .iter()
            .find_map(|(name, role)| (*role == id).then_some(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn status_strings_parse_into_role_names() {
        assert_eq!("accepted".parse::<RoleName>(), Ok(RoleName::Accepted));
        assert_eq!(" Volunteer ".parse::<RoleName>(), Ok(RoleName::Volunteer));
        assert!("organizer".parse::<RoleName>().is_err());
    }

    #[test]
    fn unknown_role_names_explain_themselves() {
        let err = "organizer".parse::<RoleName>().unwrap_err();
        assert_eq!(err, UnknownRoleName("organizer".to_owned()));
        assert_eq!(err.to_string(), "`organizer` is not a known role");
    }

    #[test]
    fn missing_required_role_is_fatal() {
        let lookup = env(&[("ACCEPTED_ROLE_ID", "1"), ("ATTENDING_ROLE_ID", "2")]);
        let err = RoleCatalog::from_lookup(lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRole(RoleName::Withdrawn)));
    }

    #[test]
    fn optional_roles_may_be_absent() {
        let lookup = env(&[
            ("ACCEPTED_ROLE_ID", "1"),
            ("ATTENDING_ROLE_ID", "2"),
            ("WITHDRAWN_ROLE_ID", "3"),
            ("PENDING_ROLE_ID", "4"),
        ]);
        let catalog = RoleCatalog::from_lookup(lookup).unwrap();
        assert_eq!(catalog.get(RoleName::Pending), Some(RoleId::new(4)));
        assert_eq!(catalog.get(RoleName::Mentor), None);
        assert_eq!(catalog.name_of(RoleId::new(2)), Some(RoleName::Attending));
    }

    #[test]
    fn garbage_ids_are_rejected() {
        let lookup = env(&[
            ("ACCEPTED_ROLE_ID", "1"),
            ("ATTENDING_ROLE_ID", "two"),
            ("WITHDRAWN_ROLE_ID", "3"),
        ]);
        assert!(matches!(
            RoleCatalog::from_lookup(lookup),
            Err(ConfigError::InvalidId { .. })
        ));
    }
}
