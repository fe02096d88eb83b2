//! Structured events produced from inbound lines.
//!
//! Nothing the server sends is dropped: lines the client does not model,
//! and lines that fail to parse, come through as [`ProtocolEvent::ServerNotice`]
//! carrying the raw text. PING is surfaced, never answered here.

use crate::message::Message;
use crate::response::Response;
use crate::util::is_channel;

/// An inbound protocol event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// 001: registration complete.
    Welcome {
        /// The nickname the server registered us under.
        nick: String,
        /// Welcome text.
        text: String,
    },
    /// Someone (possibly us) joined a channel.
    Joined { channel: String, user: String },
    /// Someone (possibly us) left a channel.
    Parted { channel: String, user: String },
    /// A message to a channel.
    PublicMessage {
        channel: String,
        nick: String,
        text: String,
    },
    /// A message addressed to us directly.
    PrivateMessage { nick: String, text: String },
    /// Someone (possibly us) changed nickname.
    NickChanged { old: String, new: String },
    /// 433: the nickname we asked for is taken.
    NickInUse { old: String },
    /// 322: one channel of a LIST reply.
    ListItem {
        channel: String,
        users: u32,
        topic: String,
    },
    /// 323: end of a LIST reply.
    ListEnd,
    /// Liveness probe; must be answered with the same token.
    Ping { token: String },
    /// NOTICE, MOTD lines and anything unrecognized.
    ServerNotice { text: String },
    /// The connection ended (server ERROR, EOF or socket failure).
    Disconnected { reason: String },
}

impl ProtocolEvent {
    /// Parse one decoded line. Blank lines yield `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        if line.trim().is_empty() {
            return None;
        }
        Some(match Message::parse(line) {
            Ok(msg) => Self::from_message(&msg, line),
            Err(_) => ProtocolEvent::ServerNotice {
                text: line.to_string(),
            },
        })
    }

    /// Classify a parsed message; `raw` is used for anything unrecognized.
    pub fn from_message(msg: &Message, raw: &str) -> Self {
        let unknown = || ProtocolEvent::ServerNotice {
            text: raw.to_string(),
        };
        let sender = msg.source_nick().unwrap_or_default().to_string();

        if let Some(code) = msg.numeric() {
            return match Response::from_code(code) {
                Some(Response::RPL_WELCOME) => ProtocolEvent::Welcome {
                    nick: msg.arg(0).unwrap_or_default().to_string(),
                    text: msg.trailing().unwrap_or_default().to_string(),
                },
                Some(Response::ERR_NICKNAMEINUSE) => {
                    // 433 <client> <nick> :Nickname is already in use
                    let old = if msg.params.len() >= 3 {
                        msg.arg(1)
                    } else {
                        msg.arg(0)
                    };
                    ProtocolEvent::NickInUse {
                        old: old.unwrap_or_default().to_string(),
                    }
                }
                Some(Response::RPL_LIST) if msg.params.len() >= 3 => ProtocolEvent::ListItem {
                    channel: msg.params[1].clone(),
                    users: msg.params[2].parse().unwrap_or(0),
                    topic: msg.params.get(3).cloned().unwrap_or_default(),
                },
                Some(Response::RPL_LISTEND) => ProtocolEvent::ListEnd,
                Some(r) if r.is_greeting() => ProtocolEvent::ServerNotice {
                    text: msg.trailing().unwrap_or_default().to_string(),
                },
                _ => unknown(),
            };
        }

        match (msg.command.as_str(), msg.arg(0)) {
            ("JOIN", Some(channel)) => ProtocolEvent::Joined {
                channel: channel.to_string(),
                user: sender,
            },
            ("PART", Some(channel)) => ProtocolEvent::Parted {
                channel: channel.to_string(),
                user: sender,
            },
            ("PRIVMSG", Some(target)) if msg.params.len() >= 2 => {
                let text = msg.params[1].clone();
                if is_channel(target) {
                    ProtocolEvent::PublicMessage {
                        channel: target.to_string(),
                        nick: sender,
                        text,
                    }
                } else {
                    ProtocolEvent::PrivateMessage { nick: sender, text }
                }
            }
            ("NICK", Some(new)) => ProtocolEvent::NickChanged {
                old: sender,
                new: new.to_string(),
            },
            ("PING", token) => ProtocolEvent::Ping {
                token: msg.trailing().or(token).unwrap_or_default().to_string(),
            },
            ("NOTICE", Some(_)) => ProtocolEvent::ServerNotice {
                text: msg.trailing().unwrap_or_default().to_string(),
            },
            ("ERROR", _) => ProtocolEvent::Disconnected {
                reason: msg.trailing().unwrap_or("closed by server").to_string(),
            },
            _ => unknown(),
        }
    }
}
