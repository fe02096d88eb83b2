//! Outgoing IRC commands.
//!
//! Each [`Command`] renders to exactly one wire line (without CRLF, which
//! [`crate::framer::LineFramer::encode`] appends).

use std::fmt;

/// An outgoing IRC command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `NICK nickname`
    NICK(String),
    /// `USER username 0 * :realname`
    USER(String, String),
    /// `JOIN channel`
    JOIN(String),
    /// `PART channel`
    PART(String),
    /// `PRIVMSG target :text`
    PRIVMSG(String, String),
    /// `LIST [pattern]`
    LIST(Option<String>),
    /// `QUIT [:reason]`
    QUIT(Option<String>),
    /// `PONG :token`
    PONG(String),
    /// A pre-formed line sent as-is.
    Raw(String),
}

impl Command {
    /// `LIST *pattern*`, the server-side channel search.
    pub fn search(pattern: &str) -> Self {
        Command::LIST(Some(format!("*{}*", pattern.trim())))
    }

    /// The command word, for logging.
    pub fn name(&self) -> &str {
        match self {
            Command::NICK(_) => "NICK",
            Command::USER(..) => "USER",
            Command::JOIN(_) => "JOIN",
            Command::PART(_) => "PART",
            Command::PRIVMSG(..) => "PRIVMSG",
            Command::LIST(_) => "LIST",
            Command::QUIT(_) => "QUIT",
            Command::PONG(_) => "PONG",
            Command::Raw(line) => line.split(' ').next().unwrap_or(""),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::NICK(nick) => write!(f, "NICK {}", nick),
            Command::USER(user, realname) => write!(f, "USER {} 0 * :{}", user, realname),
            Command::JOIN(channel) => write!(f, "JOIN {}", channel),
            Command::PART(channel) => write!(f, "PART {}", channel),
            Command::PRIVMSG(target, text) => write!(f, "PRIVMSG {} :{}", target, text),
            Command::LIST(None) => f.write_str("LIST"),
            Command::LIST(Some(pattern)) => write!(f, "LIST {}", pattern),
            Command::QUIT(None) => f.write_str("QUIT"),
            Command::QUIT(Some(reason)) => write!(f, "QUIT :{}", reason),
            Command::PONG(token) => write!(f, "PONG :{}", token),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_lines() {
        assert_eq!(Command::NICK("anon".into()).to_string(), "NICK anon");
        assert_eq!(
            Command::USER("anon".into(), "Anon-Framework User".into()).to_string(),
            "USER anon 0 * :Anon-Framework User"
        );
    }

    #[test]
    fn test_channel_and_message_lines() {
        assert_eq!(Command::JOIN("#test".into()).to_string(), "JOIN #test");
        assert_eq!(Command::PART("#test".into()).to_string(), "PART #test");
        assert_eq!(
            Command::PRIVMSG("#test".into(), "hi there".into()).to_string(),
            "PRIVMSG #test :hi there"
        );
    }

    #[test]
    fn test_list_quit_pong() {
        assert_eq!(Command::LIST(None).to_string(), "LIST");
        assert_eq!(Command::search("rust").to_string(), "LIST *rust*");
        assert_eq!(Command::QUIT(None).to_string(), "QUIT");
        assert_eq!(Command::QUIT(Some("bye".into())).to_string(), "QUIT :bye");
        assert_eq!(Command::PONG("abc123".into()).to_string(), "PONG :abc123");
    }

    #[test]
    fn test_raw_passthrough() {
        let raw = Command::Raw("WHOIS someone".into());
        assert_eq!(raw.to_string(), "WHOIS someone");
        assert_eq!(raw.name(), "WHOIS");
    }
}
