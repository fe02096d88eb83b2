//! Client configuration loaded from TOML.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::DEFAULT_MAX_NICK_RETRIES;
use crate::transport::{TlsVerify, TransportConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub proxy: ProxyConfig,
    pub tls: TlsConfig,
    /// Server directory offered by the Server menu, in order.
    pub servers: ServerList,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Transport settings derived from the proxy and TLS sections.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            proxy_host: self.proxy.host.clone(),
            proxy_port: self.proxy.port,
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            tls_verify: if self.tls.verify {
                TlsVerify::Verify
            } else {
                TlsVerify::NoVerify
            },
        }
    }

    /// Resolve a Server menu answer: a 1-based directory number or
    /// `host[:port]`. Bare hosts use 6667 without TLS.
    pub fn resolve_server(&self, input: &str) -> Option<ServerEntry> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Ok(index) = input.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| self.servers.0.get(i))
                .cloned();
        }
        if let Some(entry) = self.servers.0.iter().find(|s| {
            s.name.eq_ignore_ascii_case(input) || s.host.eq_ignore_ascii_case(input)
        }) {
            return Some(entry.clone());
        }

        let (host, port) = match input.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (input, 6667),
        };
        if host.is_empty() || host.contains(char::is_whitespace) {
            return None;
        }
        Some(ServerEntry {
            name: host.to_string(),
            host: host.to_string(),
            port,
            tls: port == 6697,
        })
    }
}

/// `[client]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Nickname suggested at startup.
    pub nickname: String,
    /// Real name sent in USER.
    pub realname: String,
    /// Channel joined right after registration, if any.
    pub channel: Option<String>,
    /// Route connections through the SOCKS5 proxy.
    pub use_proxy: bool,
    /// Ceiling on nickname-in-use retries.
    pub max_nick_retries: u32,
    /// Seconds to wait for 001 after sending NICK/USER.
    pub registration_timeout_secs: u64,
    /// Seconds allowed for TCP, proxy and TLS setup.
    pub connect_timeout_secs: u64,
    /// Inbound text encoding label.
    pub encoding: String,
    /// Encoding for byte spans that are not valid in `encoding`. Set to
    /// `None` to show U+FFFD for them instead.
    pub fallback_encoding: Option<String>,
    /// Where saved identities are persisted; in-memory only when unset.
    pub identities_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nickname: "anon_framework_user".to_string(),
            realname: "Anon-Framework User".to_string(),
            channel: Some("#anon-framework".to_string()),
            use_proxy: false,
            max_nick_retries: DEFAULT_MAX_NICK_RETRIES,
            registration_timeout_secs: 60,
            connect_timeout_secs: 30,
            encoding: "utf-8".to_string(),
            fallback_encoding: Some("windows-1252".to_string()),
            identities_path: None,
        }
    }
}

impl ClientConfig {
    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }
}

/// `[proxy]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9050,
        }
    }
}

/// `[tls]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Check server certificates against the platform trust store.
    pub verify: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// One server directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerEntry {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
}

impl std::fmt::Display for ServerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}:{}", self.name, self.host, self.port)?;
        if self.tls {
            f.write_str(", tls")?;
        }
        f.write_str(")")
    }
}

/// The `[[servers]]` list, defaulting to a few public networks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ServerList(pub Vec<ServerEntry>);

impl Default for ServerList {
    fn default() -> Self {
        let entry = |name: &str, host: &str, port, tls| ServerEntry {
            name: name.to_string(),
            host: host.to_string(),
            port,
            tls,
        };
        ServerList(vec![
            entry("Libera.Chat", "irc.libera.chat", 6697, true),
            entry("OFTC", "irc.oftc.net", 6697, true),
            entry("EFnet", "irc.efnet.org", 6667, false),
            entry("Rizon", "irc.rizon.net", 6697, true),
        ])
    }
}

impl ServerList {
    pub fn iter(&self) -> impl Iterator<Item = &ServerEntry> {
        self.0.iter()
    }
}
