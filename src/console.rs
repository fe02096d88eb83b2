//! Terminal output shared by the printer task and the input loop.
//!
//! Output lines are timestamped. When a prompt is showing, printing an
//! event clears the input line first and redraws the prompt after, so
//! asynchronous traffic never garbles what the user is typing.

use std::io::{self, Write};

use chrono::Local;

use crate::client::ClientEvent;
use crate::event::ProtocolEvent;

const CLEAR_LINE: &str = "\r\x1b[2K";

/// Text for one event, or `None` for events not shown to the user.
pub fn render(event: &ClientEvent) -> Option<String> {
    let event = match event {
        ClientEvent::Protocol(event) => event,
        ClientEvent::Error(e) => return Some(format!("!!! {}", e)),
    };

    Some(match event {
        ProtocolEvent::Welcome { text, .. } => format!("-!- {}", text),
        ProtocolEvent::Joined { channel, user } => format!("-!- {} has joined {}", user, channel),
        ProtocolEvent::Parted { channel, user } => format!("-!- {} has left {}", user, channel),
        ProtocolEvent::PublicMessage {
            channel,
            nick,
            text,
        } => format!("[{}] <{}> {}", channel, nick, text),
        ProtocolEvent::PrivateMessage { nick, text } => format!("*{}* {}", nick, text),
        ProtocolEvent::NickChanged { old, new } => format!("-!- {} is now known as {}", old, new),
        ProtocolEvent::NickInUse { old } => format!("-!- Nickname {} is already in use", old),
        ProtocolEvent::ListItem {
            channel,
            users,
            topic,
        } => format!("{:<24} {:>5}  {}", channel, users, topic),
        ProtocolEvent::ListEnd => "-!- End of channel list".to_string(),
        ProtocolEvent::Ping { .. } => return None,
        ProtocolEvent::ServerNotice { text } => format!("-!- {}", text),
        ProtocolEvent::Disconnected { reason } => format!("-!- Disconnected: {}", reason),
    })
}

/// Line-oriented console with a redrawable prompt.
pub struct Console<W: Write = io::Stdout> {
    out: W,
    prompt: String,
    prompt_visible: bool,
    timestamps: bool,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            prompt: "> ".to_string(),
            prompt_visible: false,
            timestamps: true,
        }
    }

    /// Disable timestamps (deterministic output in tests).
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Print an event if it has a rendering.
    pub fn event(&mut self, event: &ClientEvent) -> io::Result<()> {
        match render(event) {
            Some(text) => self.line(&text),
            None => Ok(()),
        }
    }

    /// Print one line above the prompt.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        if self.prompt_visible {
            self.out.write_all(CLEAR_LINE.as_bytes())?;
        }
        if self.timestamps {
            write!(self.out, "[{}] ", Local::now().format("%H:%M:%S"))?;
        }
        writeln!(self.out, "{}", text)?;
        if self.prompt_visible {
            self.out.write_all(self.prompt.as_bytes())?;
        }
        self.out.flush()
    }

    /// Print a block (menus, listings) without timestamps.
    pub fn block(&mut self, text: &str) -> io::Result<()> {
        if self.prompt_visible {
            self.out.write_all(CLEAR_LINE.as_bytes())?;
            self.prompt_visible = false;
        }
        writeln!(self.out, "{}", text.trim_end())?;
        self.out.flush()
    }

    /// Show `prompt` and keep redrawing it after every printed line.
    pub fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        prompt.clone_into(&mut self.prompt);
        self.prompt_visible = true;
        self.out.write_all(self.prompt.as_bytes())?;
        self.out.flush()
    }

    /// The user submitted a line; the prompt is gone until shown again.
    pub fn prompt_taken(&mut self) {
        self.prompt_visible = false;
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    fn text(console: &Console<Vec<u8>>) -> String {
        String::from_utf8_lossy(console.get_ref()).into_owned()
    }

    #[test]
    fn test_render_events() {
        let msg = ClientEvent::Protocol(ProtocolEvent::PublicMessage {
            channel: "#test".into(),
            nick: "alice".into(),
            text: "hi".into(),
        });
        assert_eq!(render(&msg).unwrap(), "[#test] <alice> hi");

        let ping = ClientEvent::Protocol(ProtocolEvent::Ping { token: "x".into() });
        assert_eq!(render(&ping), None);

        let err = ClientEvent::Error(ClientError::NotInChannel);
        assert_eq!(render(&err).unwrap(), "!!! you are not in a channel");

        let item = ClientEvent::Protocol(ProtocolEvent::ListItem {
            channel: "#rust".into(),
            users: 42,
            topic: "Rust".into(),
        });
        assert!(render(&item).unwrap().starts_with("#rust "));
    }

    #[test]
    fn test_line_redraws_prompt() {
        let mut console = Console::new(Vec::new()).without_timestamps();
        console.prompt("> ").unwrap();
        console.line("-!- hello").unwrap();
        assert_eq!(text(&console), format!("> {}-!- hello\n> ", CLEAR_LINE));
    }

    #[test]
    fn test_line_without_prompt() {
        let mut console = Console::new(Vec::new()).without_timestamps();
        console.line("plain").unwrap();
        console.prompt("> ").unwrap();
        console.prompt_taken();
        console.line("after").unwrap();
        assert_eq!(text(&console), "plain\n> after\n");
    }

    #[test]
    fn test_timestamps() {
        let mut console = Console::new(Vec::new());
        console.line("x").unwrap();
        let out = text(&console);
        assert!(out.starts_with('['));
        assert!(out.ends_with("] x\n"));
    }
}
