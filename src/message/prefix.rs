//! IRC message prefix (source).

use std::fmt;

/// The source of an inbound message: a server name or `nick[!user][@host]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    /// A server name, e.g. `irc.libera.chat`.
    ServerName(String),
    /// A user source.
    Nickname(String, Option<String>, Option<String>),
}

impl Prefix {
    /// Parse a prefix string (without the leading `:`).
    ///
    /// A bare word containing a dot and no `!`/`@` is taken as a server name.
    pub fn parse(s: &str) -> Self {
        let (rest, host) = match s.split_once('@') {
            Some((rest, host)) => (rest, Some(host.to_string())),
            None => (s, None),
        };
        let (nick, user) = match rest.split_once('!') {
            Some((nick, user)) => (nick, Some(user.to_string())),
            None => (rest, None),
        };

        if user.is_none() && host.is_none() && nick.contains('.') {
            Prefix::ServerName(nick.to_string())
        } else {
            Prefix::Nickname(nick.to_string(), user, host)
        }
    }

    /// The nickname part for user sources, the server name otherwise.
    pub fn name(&self) -> &str {
        match self {
            Prefix::ServerName(name) => name,
            Prefix::Nickname(nick, _, _) => nick,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_user_prefix() {
        let p = Prefix::parse("nick!user@host.example");
        assert_eq!(
            p,
            Prefix::Nickname(
                "nick".into(),
                Some("user".into()),
                Some("host.example".into())
            )
        );
        assert_eq!(p.name(), "nick");
        assert_eq!(p.to_string(), "nick!user@host.example");
    }

    #[test]
    fn test_server_and_bare_nick() {
        assert_eq!(
            Prefix::parse("irc.example"),
            Prefix::ServerName("irc.example".into())
        );
        assert_eq!(
            Prefix::parse("nick"),
            Prefix::Nickname("nick".into(), None, None)
        );
        assert_eq!(Prefix::parse("nick@host").name(), "nick");
    }
}
