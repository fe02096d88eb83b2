//! Connection manager: owns the session record and the I/O tasks.
//!
//! One [`ConnectionManager`] drives at most one server connection at a
//! time. Each attached transport gets a receiver task (inbound bytes to
//! events) and a writer task (queued lines to the socket), both tagged
//! with an epoch so tasks from an older connection cannot touch a newer
//! one. User operations are synchronous: they plan commands against the
//! [`Connection`] record and queue them for the writer.
//!
//! The record and the link sit behind `parking_lot` mutexes that are never
//! held across an `.await`.

mod receiver;
mod writer;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::receiver::{End, Receiver};
use crate::command::Command;
use crate::config::{Config, ServerEntry};
use crate::error::{ClientError, Result};
use crate::event::ProtocolEvent;
use crate::framer::LineFramer;
use crate::state::{Connection, ConnectionState, Reaction};
use crate::transport::{Transport, TransportConfig};
use crate::util::channel_name;

/// How long a disconnect waits for queued lines (QUIT) to be written.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Events delivered to the session.
#[derive(Debug)]
pub enum ClientEvent {
    /// An inbound protocol event, in arrival order.
    Protocol(ProtocolEvent),
    /// A fatal error ended the connection.
    Error(ClientError),
}

/// Settings the manager needs for every connection.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub realname: String,
    pub registration_timeout: Duration,
    pub max_nick_retries: u32,
    pub encoding: String,
    pub fallback_encoding: Option<String>,
    pub transport: TransportConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            realname: config.client.realname.clone(),
            registration_timeout: config.client.registration_timeout(),
            max_nick_retries: config.client.max_nick_retries,
            encoding: config.client.encoding.clone(),
            fallback_encoding: config.client.fallback_encoding.clone(),
            transport: config.transport(),
        }
    }
}

/// The live half of a connection: queue, token and writer task.
struct Link {
    epoch: u64,
    queue: mpsc::UnboundedSender<Bytes>,
    cancel: CancellationToken,
    writer: JoinHandle<()>,
}

struct Shared {
    conn: Mutex<Connection>,
    link: Mutex<Option<Link>>,
    epoch: AtomicU64,
}

/// Handle to the client's server session. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
    settings: Arc<ClientSettings>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl ConnectionManager {
    /// Create a manager and the receiving end of its event stream.
    pub fn new(settings: ClientSettings) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let manager = Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(Connection::new(settings.max_nick_retries)),
                link: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
            settings: Arc::new(settings),
            events,
        };
        (manager, rx)
    }

    /// Connect to `entry` and register. Returns once 001 arrives.
    ///
    /// Any existing connection is closed first. There is no automatic retry.
    pub async fn connect(&self, entry: &ServerEntry, nickname: &str, use_proxy: bool) -> Result<()> {
        let nickname = validate_nickname(nickname)?;
        self.disconnect(None).await;

        let registration = self.shared.conn.lock().begin_connect(
            &entry.host,
            entry.port,
            nickname,
            use_proxy,
            &self.settings.realname,
        );
        info!(server = %entry.host, port = entry.port, nickname, use_proxy, "connecting");

        let transport = match Transport::open(entry, use_proxy, &self.settings.transport).await {
            Ok(transport) => transport,
            Err(e) => {
                self.shared.conn.lock().mark_disconnected();
                warn!(server = %entry.host, "connect failed: {}", e);
                return Err(e.into());
            }
        };
        self.register(transport, registration).await
    }

    /// Register over an already open transport.
    pub async fn connect_with(
        &self,
        transport: Transport,
        server: &str,
        port: u16,
        nickname: &str,
    ) -> Result<()> {
        let nickname = validate_nickname(nickname)?;
        self.disconnect(None).await;

        let registration = self.shared.conn.lock().begin_connect(
            server,
            port,
            nickname,
            false,
            &self.settings.realname,
        );
        self.register(transport, registration).await
    }

    async fn register(&self, transport: Transport, registration: Vec<Command>) -> Result<()> {
        let (welcome_tx, welcome_rx) = oneshot::channel();
        let epoch = match self.attach(transport, welcome_tx) {
            Ok(epoch) => epoch,
            Err(e) => {
                self.shared.conn.lock().mark_disconnected();
                return Err(e);
            }
        };
        for cmd in registration {
            if let Err(e) = self.send(cmd) {
                self.teardown(Some(epoch), None).await;
                return Err(e);
            }
        }

        let timeout = self.settings.registration_timeout;
        let result = match tokio::time::timeout(timeout, welcome_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Connect(
                "connection closed before registration".to_string(),
            )),
            Err(_) => {
                self.teardown(Some(epoch), Some(Command::QUIT(None))).await;
                Err(ClientError::RegistrationTimeout(timeout))
            }
        };

        match &result {
            Ok(()) => info!(nickname = %self.shared.conn.lock().nickname, "registered"),
            Err(e) => {
                self.teardown(Some(epoch), None).await;
                warn!("registration failed: {}", e);
            }
        }
        result
    }

    /// Split the transport and spawn the writer and receiver tasks.
    fn attach(
        &self,
        transport: Transport,
        welcome: oneshot::Sender<Result<()>>,
    ) -> Result<u64> {
        let framer = LineFramer::with_encoding(
            &self.settings.encoding,
            self.settings.fallback_encoding.as_deref(),
        )?;
        let (reader, writer) = transport.split();
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let (queue, queue_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(writer::run(writer, queue_rx, cancel.clone()));
        *self.shared.link.lock() = Some(Link {
            epoch,
            queue,
            cancel: cancel.clone(),
            writer,
        });

        tokio::spawn(
            Receiver {
                manager: self.clone(),
                epoch,
                reader,
                framer,
                cancel,
                welcome: Some(welcome),
            }
            .run(),
        );
        debug!(epoch, "transport attached");
        Ok(epoch)
    }

    /// Queue a command for the writer.
    pub(crate) fn send(&self, cmd: Command) -> Result<()> {
        let line = LineFramer::encode(&cmd.to_string());
        let link = self.shared.link.lock();
        let link = link.as_ref().ok_or(ClientError::NotConnected)?;
        debug!(command = cmd.name(), "send");
        link.queue.send(line).map_err(|_| ClientError::NotConnected)
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.shared
            .link
            .lock()
            .as_ref()
            .is_some_and(|link| link.epoch == epoch)
    }

    /// Apply an inbound event for the connection tagged `epoch`.
    /// `None` when that connection is no longer current.
    pub(crate) fn apply(&self, epoch: u64, event: &ProtocolEvent) -> Option<Vec<Reaction>> {
        if !self.is_current(epoch) {
            return None;
        }
        Some(self.shared.conn.lock().apply(event))
    }

    /// Close the link for `epoch` (or whichever is current when `None`).
    /// Queues `quit` first and waits briefly for it to be written.
    /// Returns whether a link was torn down.
    async fn teardown(&self, epoch: Option<u64>, quit: Option<Command>) -> bool {
        let link = {
            let mut guard = self.shared.link.lock();
            match (guard.as_ref(), epoch) {
                (Some(link), Some(e)) if link.epoch != e => return false,
                // Already detached; the record may belong to a newer connect.
                (None, Some(_)) => return false,
                _ => guard.take(),
            }
        };
        let Some(Link {
            epoch,
            queue,
            cancel,
            mut writer,
        }) = link
        else {
            self.shared.conn.lock().mark_disconnected();
            return false;
        };

        if let Some(cmd) = quit {
            let _ = queue.send(LineFramer::encode(&cmd.to_string()));
        }
        drop(queue);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            warn!(epoch, "writer did not drain in time");
            writer.abort();
        }
        cancel.cancel();
        self.shared.conn.lock().mark_disconnected();
        debug!(epoch, "transport detached");
        true
    }

    /// Called by the receiver when its loop ends.
    pub(crate) async fn finish(
        &self,
        epoch: u64,
        end: End,
        welcome: Option<oneshot::Sender<Result<()>>>,
    ) {
        if !self.is_current(epoch) {
            return;
        }

        let (error, reason, announced) = match end {
            End::Cancelled => (None, "connection lost".to_string(), false),
            End::Closed { reason, announced } => (None, reason, announced),
            End::Failed(e) => {
                let reason = e.to_string();
                (Some(e), reason, false)
            }
        };
        let quit = match &error {
            Some(ClientError::NickExhausted { .. }) => Some(Command::QUIT(None)),
            _ => None,
        };
        self.teardown(Some(epoch), quit).await;
        info!(epoch, %reason, "connection ended");

        match welcome {
            Some(tx) => {
                let err = error.unwrap_or_else(|| ClientError::Connect(reason));
                let _ = tx.send(Err(err));
            }
            None => {
                if let Some(e) = error {
                    self.emit(ClientEvent::Error(e));
                }
                if !announced {
                    self.emit(ClientEvent::Protocol(ProtocolEvent::Disconnected { reason }));
                }
            }
        }
    }

    /// Send QUIT, close the transport and stop the tasks. Idempotent.
    pub async fn disconnect(&self, reason: Option<&str>) {
        let quit = Command::QUIT(reason.map(str::to_string));
        if self.teardown(None, Some(quit)).await {
            info!("disconnected");
        }
    }

    /// Join `name` (adding `#` when missing), leaving the current channel.
    /// Returns the normalized channel name; nothing is sent when already in it.
    pub fn join_channel(&self, name: &str) -> Result<String> {
        let commands = self.shared.conn.lock().plan_join(name)?;
        for cmd in commands {
            self.send(cmd)?;
        }
        Ok(channel_name(name))
    }

    /// Leave the current channel. Returns the channel left, if any.
    pub fn leave_channel(&self) -> Result<Option<String>> {
        let commands = self.shared.conn.lock().plan_leave();
        let mut left = None;
        for cmd in commands {
            if let Command::PART(channel) = &cmd {
                left = Some(channel.clone());
            }
            self.send(cmd)?;
        }
        Ok(left)
    }

    /// Send `text` to the current channel.
    pub fn send_message(&self, text: &str) -> Result<()> {
        let commands = self.shared.conn.lock().plan_message(text)?;
        for cmd in commands {
            self.send(cmd)?;
        }
        Ok(())
    }

    /// Ask the server for a new nickname.
    pub fn change_nickname(&self, nickname: &str) -> Result<()> {
        let cmd = self.shared.conn.lock().plan_rename(nickname)?;
        self.send(cmd)
    }

    /// Request the full channel list.
    pub fn list_channels(&self) -> Result<()> {
        self.require_connected()?;
        self.send(Command::LIST(None))
    }

    /// Request channels matching `pattern`.
    pub fn search_channels(&self, pattern: &str) -> Result<()> {
        self.require_connected()?;
        self.send(Command::search(pattern))
    }

    /// Send a line verbatim.
    pub fn send_raw(&self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.send(Command::Raw(line.to_string()))
    }

    fn require_connected(&self) -> Result<()> {
        if self.shared.conn.lock().is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// A copy of the connection record.
    pub fn snapshot(&self) -> Connection {
        self.shared.conn.lock().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.conn.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

fn validate_nickname(nickname: &str) -> Result<&str> {
    let nickname = nickname.trim();
    if nickname.is_empty() || nickname.contains(char::is_whitespace) {
        return Err(ClientError::InvalidNickname(nickname.to_string()));
    }
    Ok(nickname)
}
