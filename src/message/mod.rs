//! Owned IRC messages parsed from inbound lines.

mod nom_parser;
mod prefix;

use std::str::FromStr;

pub use self::nom_parser::ParsedMessage;
pub use self::prefix::Prefix;

use crate::error::MessageParseError;

/// One inbound IRC message: `[:prefix] <command> [params...] [:trailing]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message source, if the server sent one.
    pub prefix: Option<Prefix>,
    /// Command name (upper-cased) or three-digit numeric.
    pub command: String,
    /// Parameters, trailing included as the last element.
    pub params: Vec<String>,
}

impl Message {
    /// Parse one line, with or without its line ending.
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        let parsed = ParsedMessage::parse(line)?;
        Ok(Message {
            prefix: parsed.prefix.map(Prefix::parse),
            command: parsed.command.to_ascii_uppercase(),
            params: parsed.params.into_iter().map(String::from).collect(),
        })
    }

    /// Parameter at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, which carries free text for most commands.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Nickname (or server name) of the sender.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().map(Prefix::name)
    }

    /// The numeric reply code, for three-digit commands.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owned() {
        let msg: Message = ":nick!u@h privmsg #rust :hello there".parse().unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.source_nick(), Some("nick"));
        assert_eq!(msg.arg(0), Some("#rust"));
        assert_eq!(msg.trailing(), Some("hello there"));
        assert_eq!(msg.numeric(), None);
    }

    #[test]
    fn test_numeric() {
        let msg = Message::parse(":irc.example 001 nick :Welcome").unwrap();
        assert_eq!(msg.numeric(), Some(1));
        assert_eq!(msg.source_nick(), Some("irc.example"));
        assert_eq!(Message::parse("PING :x").unwrap().numeric(), None);
    }
}
