//! Shared helpers: an in-memory IRC server on the far end of a duplex pipe.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anon_irc::client::ClientEvent;
use anon_irc::event::ProtocolEvent;
use anon_irc::transport::Transport;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines,
    ReadHalf, WriteHalf,
};
use tokio::sync::mpsc::UnboundedReceiver;

pub const STEP: Duration = Duration::from_secs(5);

/// The server side of a simulated connection.
pub struct FakeServer<S> {
    lines: Lines<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
}

impl<S: AsyncRead + AsyncWrite> FakeServer<S> {
    pub fn new(stream: S) -> Self {
        let (read, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Next line the client sent, without CRLF.
    pub async fn expect(&mut self) -> String {
        tokio::time::timeout(STEP, self.lines.next_line())
            .await
            .expect("timed out waiting for client line")
            .expect("read failed")
            .expect("client closed the connection")
    }

    /// `None` once the client closed its side.
    pub async fn next_or_closed(&mut self) -> Option<String> {
        tokio::time::timeout(STEP, self.lines.next_line())
            .await
            .expect("timed out waiting for client")
            .ok()
            .flatten()
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .expect("write to client failed");
    }

    /// Consume NICK/USER and answer with 001.
    pub async fn register(&mut self, nick: &str) {
        assert_eq!(self.expect().await, format!("NICK {}", nick));
        assert!(self.expect().await.starts_with(&format!("USER {} 0 * :", nick)));
        self.send(&format!(":irc.test 001 {} :Welcome to the test network", nick))
            .await;
    }
}

/// A client transport wired to a fake server.
pub fn pipe() -> (Transport, FakeServer<DuplexStream>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    (Transport::from_stream(client), FakeServer::new(server))
}

/// Skip events until one matches.
pub async fn wait_for<F>(events: &mut UnboundedReceiver<ClientEvent>, mut pred: F) -> ClientEvent
where
    F: FnMut(&ClientEvent) -> bool,
{
    tokio::time::timeout(STEP, async {
        loop {
            let event = events.recv().await.expect("event stream ended");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub fn is_protocol(event: &ClientEvent, f: impl Fn(&ProtocolEvent) -> bool) -> bool {
    matches!(event, ClientEvent::Protocol(e) if f(e))
}

/// Poll until `cond` holds.
pub async fn eventually<F: FnMut() -> bool>(mut cond: F) {
    tokio::time::timeout(STEP, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Console sink that tests can read back.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
