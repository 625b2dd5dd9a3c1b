//! Recent-activity store - per-identity message history

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::application::errors::RecentDataError;
use crate::domain::entities::Identity;

/// One remembered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub time: DateTime<Utc>,
    pub channel: String,
    pub message: String,
}

/// Append-only history for one identity
#[derive(Debug, Clone)]
pub struct UserData {
    pub identity: Identity,
    entries: Vec<RecentEntry>,
}

impl UserData {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            entries: Vec::new(),
        }
    }

    pub fn msg(&mut self, channel: impl Into<String>, message: impl Into<String>) {
        self.entries.push(RecentEntry {
            time: Utc::now(),
            channel: channel.into(),
            message: message.into(),
        });
    }

    pub fn last_msg(&self) -> Result<&RecentEntry, RecentDataError> {
        self.entries
            .last()
            .ok_or_else(|| RecentDataError::EmptyHistory(self.identity.fingerprint()))
    }

    /// Oldest first
    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recent-activity store keyed by the (nick, ident, host) triple.
///
/// Records are created on first sight and live for the whole process;
/// callers that need eviction wrap this with their own policy.
#[derive(Default)]
pub struct RecentData {
    users: RwLock<HashMap<Identity, UserData>>,
}

impl RecentData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, nick: &str, ident: &str, host: &str, channel: &str, message: &str) {
        self.store_identity(&Identity::new(nick, ident, host), channel, message)
    }

    pub fn store_identity(&self, identity: &Identity, channel: &str, message: &str) {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users
            .entry(identity.clone())
            .or_insert_with(|| UserData::new(identity.clone()))
            .msg(channel, message);
    }

    /// Snapshot of the record for this triple
    pub fn user(&self, nick: &str, ident: &str, host: &str) -> Result<UserData, RecentDataError> {
        self.user_identity(&Identity::new(nick, ident, host))
    }

    pub fn user_identity(&self, identity: &Identity) -> Result<UserData, RecentDataError> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned()
            .ok_or_else(|| RecentDataError::NotFound(identity.fingerprint()))
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_user_returns_last_message() {
        let data = RecentData::new();
        data.store("bruno", "veiset", "host", "#a", "first");
        data.store("bruno", "veiset", "host", "#b", "second");

        let user = data.user("bruno", "veiset", "host").unwrap();
        let last = user.last_msg().unwrap();
        assert_eq!(last.channel, "#b");
        assert_eq!(last.message, "second");
        assert_eq!(user.len(), 2);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_unknown_user_is_not_fabricated() {
        let data = RecentData::new();
        assert_eq!(
            data.user("ghost", "x", "y").unwrap_err(),
            RecentDataError::NotFound("ghost!x@y".to_string())
        );
        assert!(data.is_empty());
    }

    #[test]
    fn test_separator_characters_do_not_merge_identities() {
        let data = RecentData::new();
        data.store("a", "b@c", "d", "#a", "from the first user");
        data.store("n!x", "i", "h", "#a", "from the second user");

        assert!(matches!(data.user("a", "b", "c@d"), Err(RecentDataError::NotFound(_))));
        assert!(matches!(data.user("n", "x!i", "h"), Err(RecentDataError::NotFound(_))));

        let first = data.user("a", "b@c", "d").unwrap();
        assert_eq!(first.identity, Identity::new("a", "b@c", "d"));
        assert_eq!(first.last_msg().unwrap().message, "from the first user");
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_empty_history() {
        let user = UserData::new(Identity::new("a", "b", "c"));
        assert!(matches!(user.last_msg(), Err(RecentDataError::EmptyHistory(_))));
    }
}
