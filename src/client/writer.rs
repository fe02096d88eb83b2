//! Writer task: drains the outbound queue into the transport.

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::transport::TransportWriter;

/// Write queued lines in order until every sender is gone.
///
/// A write failure cancels `cancel` so the receiver tears the session down.
pub(crate) async fn run(
    mut writer: TransportWriter,
    mut queue: UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
) {
    while let Some(line) = queue.recv().await {
        trace!(bytes = line.len(), "write");
        if let Err(e) = writer.write_line(&line).await {
            warn!("write failed: {}", e);
            cancel.cancel();
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("shutdown failed: {}", e);
    }
}
