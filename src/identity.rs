//! Named snapshots of a connection (server, nickname, channel).
//!
//! Identities live in an insertion-ordered map. When the store was opened
//! from a path, [`IdentityStore::persist`] writes it back as TOML.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::ClientError;
use crate::state::Connection;

/// Errors reading or writing the identities file.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to access identities file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse identities file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize identities: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A saved connection snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub server: String,
    pub port: u16,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Identity {
    /// Snapshot the current connection.
    pub fn from_connection(conn: &Connection) -> Self {
        Identity {
            server: conn.server.clone(),
            port: conn.port,
            nickname: conn.nickname.clone(),
            channel: conn.channel.clone(),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct IdentityFile {
    #[serde(default)]
    identities: IndexMap<String, Identity>,
}

/// Saved identities keyed by unique name.
#[derive(Debug, Default)]
pub struct IdentityStore {
    identities: IndexMap<String, Identity>,
    path: Option<PathBuf>,
}

impl IdentityStore {
    /// An empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IdentityError> {
        let path = path.as_ref().to_path_buf();
        let identities = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str::<IdentityFile>(&content)?.identities,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), count = identities.len(), "identities loaded");
        Ok(Self {
            identities,
            path: Some(path),
        })
    }

    /// Insert or overwrite. An existing name keeps its position.
    pub fn save(&mut self, name: &str, identity: Identity) {
        self.identities.insert(name.trim().to_string(), identity);
    }

    /// Look up a saved identity.
    pub fn load(&self, name: &str) -> Result<Identity, ClientError> {
        self.identities
            .get(name.trim())
            .cloned()
            .ok_or_else(|| ClientError::NotFound(name.trim().to_string()))
    }

    /// Saved names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.identities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Write the store back to its file. No-op for in-memory stores.
    pub fn persist(&self) -> Result<(), IdentityError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = IdentityFile {
            identities: self.identities.clone(),
        };
        std::fs::write(path, toml::to_string_pretty(&file)?)?;
        debug!(path = %path.display(), count = self.identities.len(), "identities saved");
        Ok(())
    }
}
