use std::fmt;

/// The (nick, ident, host) triple a chat user is observed with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub nick: String,
    pub ident: String,
    pub host: String,
}

impl Identity {
    pub fn new(nick: impl Into<String>, ident: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ident: ident.into(),
            host: host.into(),
        }
    }

    /// Parse a `nick!ident@host` mask
    pub fn parse(mask: &str) -> Option<Self> {
        let (nick, rest) = mask.split_once('!')?;
        let (ident, host) = rest.split_once('@')?;
        if nick.is_empty() || ident.is_empty() || host.is_empty() {
            return None;
        }
        Some(Self::new(nick, ident, host))
    }

    /// `nick!ident@host` rendering of this triple.
    ///
    /// Meant for display and auth matching. Parts containing `!` or `@`
    /// can render identically, so stores key on the `Identity` itself.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.nick, &self.ident, &self.host)
    }
}

pub fn fingerprint(nick: &str, ident: &str, host: &str) -> String {
    format!("{}!{}@{}", nick, ident, host)
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mask() {
        let id = Identity::parse("bruno!veiset@example.org").unwrap();
        assert_eq!(id, Identity::new("bruno", "veiset", "example.org"));
        assert_eq!(id.fingerprint(), "bruno!veiset@example.org");
    }

    #[test]
    fn test_parse_rejects_partial_masks() {
        assert!(Identity::parse("bruno").is_none());
        assert!(Identity::parse("bruno!veiset").is_none());
        assert!(Identity::parse("!veiset@host").is_none());
    }

    #[test]
    fn test_fingerprint_does_not_collide_on_concatenation() {
        let a = Identity::new("ab", "c", "d");
        let b = Identity::new("a", "bc", "d");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
