//! Receiver task: transport bytes to events, strictly in arrival order.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ClientEvent, ConnectionManager};
use crate::error::{ClientError, Result};
use crate::event::ProtocolEvent;
use crate::framer::LineFramer;
use crate::state::Reaction;
use crate::transport::{TransportReader, READ_CHUNK_SIZE};

/// Why the read loop stopped.
#[derive(Debug)]
pub(crate) enum End {
    /// Token cancelled (local disconnect or writer failure).
    Cancelled,
    /// Peer closed the stream or sent ERROR.
    Closed { reason: String, announced: bool },
    /// Unrecoverable error.
    Failed(ClientError),
}

/// Everything the receiver task owns.
pub(crate) struct Receiver {
    pub(crate) manager: ConnectionManager,
    pub(crate) epoch: u64,
    pub(crate) reader: TransportReader,
    pub(crate) framer: LineFramer,
    pub(crate) cancel: CancellationToken,
    /// Resolved once: on 001, or with the error that ended registration.
    pub(crate) welcome: Option<oneshot::Sender<Result<()>>>,
}

impl Receiver {
    pub(crate) async fn run(mut self) {
        let end = self.read_loop().await;
        debug!(epoch = self.epoch, ?end, "receiver stopped");
        self.manager.finish(self.epoch, end, self.welcome.take()).await;
    }

    async fn read_loop(&mut self) -> End {
        loop {
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => return End::Cancelled,
                chunk = self.reader.read_chunk(READ_CHUNK_SIZE) => chunk,
            };

            let bytes = match chunk {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    return End::Closed {
                        reason: "connection closed by server".to_string(),
                        announced: false,
                    }
                }
                Err(e) => return End::Failed(ClientError::Io(e)),
            };

            let lines: Vec<String> = self.framer.feed(&bytes).collect();
            for line in lines {
                if let Some(end) = self.handle_line(&line) {
                    return end;
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> Option<End> {
        debug!(line, "recv");
        let event = ProtocolEvent::from_line(line)?;

        let Some(reactions) = self.manager.apply(self.epoch, &event) else {
            // A newer connection replaced this one.
            return Some(End::Cancelled);
        };
        let mut end = None;
        for reaction in reactions {
            match reaction {
                Reaction::Send(cmd) => {
                    if let Err(e) = self.manager.send(cmd) {
                        warn!("automatic reply dropped: {}", e);
                    }
                }
                Reaction::Registered => {
                    if let Some(tx) = self.welcome.take() {
                        let _ = tx.send(Ok(()));
                    }
                }
                Reaction::Fatal(e) => end = Some(End::Failed(e)),
            }
        }

        if let ProtocolEvent::Disconnected { reason } = &event {
            end = end.or_else(|| {
                Some(End::Closed {
                    reason: reason.clone(),
                    announced: true,
                })
            });
        }
        self.manager.emit(ClientEvent::Protocol(event));
        end
    }
}
