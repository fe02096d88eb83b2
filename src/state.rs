//! Sans-IO connection record.
//!
//! [`Connection`] holds everything the client knows about its current
//! server session. It performs no I/O: inbound events go through
//! [`Connection::apply`], which returns [`Reaction`]s for the caller to
//! carry out, and user operations are planned into the commands to send.

use crate::command::Command;
use crate::error::{ClientError, Result};
use crate::event::ProtocolEvent;
use crate::util::{channel_name, privmsg_text_budget, split_message};

/// Default ceiling on `NICK <nick>_` retries per registration or rename.
pub const DEFAULT_MAX_NICK_RETRIES: u32 = 5;

/// Lifecycle of the server session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Transport open, NICK/USER sent, waiting for 001.
    Connecting,
    /// Registered with the server.
    Connected,
}

/// What the caller must do after applying an event.
#[derive(Debug)]
pub enum Reaction {
    /// Send this command to the server.
    Send(Command),
    /// Registration completed (001 received).
    Registered,
    /// The session cannot continue.
    Fatal(ClientError),
}

/// The single shared record of the current server session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Our nickname as the server knows it.
    pub nickname: String,
    /// Joined channel; only set once the server acknowledged the JOIN.
    pub channel: Option<String>,
    /// Whether the transport goes through the SOCKS5 proxy.
    pub use_proxy: bool,
    /// Session lifecycle.
    pub state: ConnectionState,
    /// Channel we sent JOIN for and have not seen acknowledged yet.
    pub pending_join: Option<String>,
    /// Consecutive nickname-in-use retries.
    pub nick_retries: u32,
    /// Retry ceiling before giving up with [`ClientError::NickExhausted`].
    pub max_nick_retries: u32,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NICK_RETRIES)
    }
}

impl Connection {
    /// A disconnected record.
    #[must_use]
    pub fn new(max_nick_retries: u32) -> Self {
        Self {
            server: String::new(),
            port: 0,
            nickname: String::new(),
            channel: None,
            use_proxy: false,
            state: ConnectionState::Disconnected,
            pending_join: None,
            nick_retries: 0,
            max_nick_retries,
        }
    }

    /// Whether registration has completed.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Enter `Connecting` for a new server session and return the
    /// registration commands.
    pub fn begin_connect(
        &mut self,
        server: &str,
        port: u16,
        nickname: &str,
        use_proxy: bool,
        realname: &str,
    ) -> Vec<Command> {
        self.server = server.to_string();
        self.port = port;
        self.nickname = nickname.to_string();
        self.use_proxy = use_proxy;
        self.state = ConnectionState::Connecting;
        self.channel = None;
        self.pending_join = None;
        self.nick_retries = 0;

        vec![
            Command::NICK(nickname.to_string()),
            Command::USER(nickname.to_string(), realname.to_string()),
        ]
    }

    /// Drop back to `Disconnected`, forgetting the channel.
    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.channel = None;
        self.pending_join = None;
    }

    /// Apply one inbound event.
    pub fn apply(&mut self, event: &ProtocolEvent) -> Vec<Reaction> {
        match event {
            ProtocolEvent::Ping { token } => vec![Reaction::Send(Command::PONG(token.clone()))],
            ProtocolEvent::Welcome { nick, .. } => {
                if !nick.is_empty() && nick != "*" {
                    self.nickname = nick.clone();
                }
                self.nick_retries = 0;
                if self.state == ConnectionState::Connecting {
                    self.state = ConnectionState::Connected;
                    vec![Reaction::Registered]
                } else {
                    Vec::new()
                }
            }
            ProtocolEvent::NickInUse { old } => self.retry_nick(old),
            ProtocolEvent::NickChanged { old, new } => {
                if self.is_me(old) {
                    self.nickname = new.clone();
                    self.nick_retries = 0;
                }
                Vec::new()
            }
            ProtocolEvent::Joined { channel, user } => {
                if self.is_me(user) && self.is_connected() {
                    self.channel = Some(channel.clone());
                    self.pending_join = None;
                }
                Vec::new()
            }
            ProtocolEvent::Parted { channel, user } => {
                let current = self
                    .channel
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(channel));
                if self.is_me(user) && current {
                    self.channel = None;
                }
                Vec::new()
            }
            ProtocolEvent::Disconnected { .. } => {
                self.mark_disconnected();
                Vec::new()
            }
            ProtocolEvent::PublicMessage { .. }
            | ProtocolEvent::PrivateMessage { .. }
            | ProtocolEvent::ListItem { .. }
            | ProtocolEvent::ListEnd
            | ProtocolEvent::ServerNotice { .. } => Vec::new(),
        }
    }

    fn is_me(&self, nick: &str) -> bool {
        !nick.is_empty() && nick.eq_ignore_ascii_case(&self.nickname)
    }

    fn retry_nick(&mut self, rejected: &str) -> Vec<Reaction> {
        let rejected = if rejected.is_empty() || rejected == "*" {
            self.nickname.as_str()
        } else {
            rejected
        };

        if self.nick_retries >= self.max_nick_retries {
            return vec![Reaction::Fatal(ClientError::NickExhausted {
                nick: rejected.to_string(),
                attempts: self.nick_retries,
            })];
        }

        self.nick_retries += 1;
        let next = format!("{}_", rejected);
        if self.state == ConnectionState::Connecting {
            // Before 001 the server never confirms the new nick with a NICK echo.
            self.nickname = next.clone();
        }
        vec![Reaction::Send(Command::NICK(next))]
    }

    /// Commands to switch to `name`, parting the current channel first.
    pub fn plan_join(&mut self, name: &str) -> Result<Vec<Command>> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let channel = channel_name(name);

        // Servers do not echo a JOIN for a channel we are already in.
        if self
            .channel
            .as_deref()
            .is_some_and(|current| current.eq_ignore_ascii_case(&channel))
        {
            self.pending_join = None;
            return Ok(Vec::new());
        }

        let mut commands = Vec::with_capacity(2);
        if let Some(previous) = self.channel.take().or_else(|| self.pending_join.take()) {
            if !previous.eq_ignore_ascii_case(&channel) {
                commands.push(Command::PART(previous));
            }
        }
        self.pending_join = Some(channel.clone());
        commands.push(Command::JOIN(channel));
        Ok(commands)
    }

    /// PART for the current channel (or one still being joined), or nothing
    /// when not in one.
    pub fn plan_leave(&mut self) -> Vec<Command> {
        let pending = self.pending_join.take();
        match self.channel.take().or(pending) {
            Some(channel) if self.is_connected() => vec![Command::PART(channel)],
            _ => Vec::new(),
        }
    }

    /// PRIVMSG lines for `text`, split to fit the line limit.
    pub fn plan_message(&self, text: &str) -> Result<Vec<Command>> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let channel = self.channel.as_ref().ok_or(ClientError::NotInChannel)?;
        let budget = privmsg_text_budget(channel);

        Ok(split_message(text, budget)
            .map(|chunk| Command::PRIVMSG(channel.clone(), chunk.to_string()))
            .collect())
    }

    /// NICK for a user-requested rename; resets the retry budget.
    pub fn plan_rename(&mut self, nickname: &str) -> Result<Command> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let nickname = nickname.trim();
        if nickname.is_empty() || nickname.contains(char::is_whitespace) {
            return Err(ClientError::InvalidNickname(nickname.to_string()));
        }
        self.nick_retries = 0;
        Ok(Command::NICK(nickname.to_string()))
    }
}
