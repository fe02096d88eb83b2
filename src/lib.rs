//! # anon-irc
//!
//! An interactive IRC client that speaks the wire protocol directly,
//! optionally through a SOCKS5 anonymizing proxy (Tor) and TLS.
//!
//! ## Features
//!
//! - Layered transport: TCP, SOCKS5 tunnel, TLS
//! - Incremental line framing with lossy decoding and a fallback encoding
//! - nom-based parsing of inbound lines into structured events
//! - Sans-IO connection record with nickname retry and channel tracking
//! - Concurrent receive, send and print tasks around a line-based input loop
//! - Table-driven interactive menu and saved identities

#![deny(clippy::all)]

//! ## Quick Start
//!
//! ```rust
//! use anon_irc::event::ProtocolEvent;
//! use anon_irc::framer::LineFramer;
//!
//! let mut framer = LineFramer::new();
//! let lines: Vec<String> = framer.feed(b"PING :abc123\r\n:srv 001 me :Hi").collect();
//! assert_eq!(lines, vec!["PING :abc123"]);
//!
//! let event = ProtocolEvent::from_line(&lines[0]);
//! assert_eq!(event, Some(ProtocolEvent::Ping { token: "abc123".into() }));
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod framer;
pub mod identity;
pub mod menu;
pub mod message;
pub mod response;
pub mod session;
pub mod state;
pub mod transport;
pub mod util;

pub use self::client::{ClientEvent, ClientSettings, ConnectionManager};
pub use self::command::Command;
pub use self::config::{Config, ServerEntry};
pub use self::error::{ClientError, Result};
pub use self::event::ProtocolEvent;
pub use self::framer::LineFramer;
pub use self::identity::{Identity, IdentityStore};
pub use self::message::{Message, Prefix};
pub use self::response::Response;
pub use self::session::{Session, SessionOptions};
pub use self::state::{Connection, ConnectionState};
pub use self::transport::{Transport, TransportConfig};
