use crate::application::errors::ConfigError;
use crate::domain::entities::Identity;
use crate::infrastructure::config::AuthConfig;

/// Trust levels from the `auth` config section.
///
/// Entries are either a bare nick or a full `nick!ident@host` mask.
/// Owners count as admins.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    owners: Vec<String>,
    admins: Vec<String>,
}

impl Auth {
    pub fn new(owners: Vec<String>, admins: Vec<String>) -> Self {
        Self { owners, admins }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let all = config.owners.iter().chain(config.admins.iter());
        if let Some(bad) = all.into_iter().find(|e| e.trim().is_empty() || e.contains(char::is_whitespace)) {
            return Err(ConfigError::InvalidValue(format!("bad auth entry: {:?}", bad)));
        }
        Ok(Self::new(config.owners.clone(), config.admins.clone()))
    }

    pub fn is_owner(&self, identity: Option<&Identity>) -> bool {
        identity.is_some_and(|id| self.owners.iter().any(|e| matches(e, id)))
    }

    pub fn is_admin(&self, identity: Option<&Identity>) -> bool {
        self.is_owner(identity)
            || identity.is_some_and(|id| self.admins.iter().any(|e| matches(e, id)))
    }
}

fn matches(entry: &str, identity: &Identity) -> bool {
    if entry.contains('!') {
        Identity::parse(entry).is_some_and(|mask| &mask == identity)
    } else {
        entry.eq_ignore_ascii_case(&identity.nick)
    }
}
