//! Byte-stream transport to an IRC server.
//!
//! Layers compose by decoration: a TCP socket (to the proxy when one is
//! used), then an optional SOCKS5 tunnel, then optional TLS. The result is
//! split into a read half owned by the receiver task and a write half
//! owned by the writer task.

pub mod socks;
pub mod tls;

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::ServerEntry;
use crate::error::TransportError;

pub use self::tls::TlsVerify;

/// Default read size for [`TransportReader::read_chunk`].
pub const READ_CHUNK_SIZE: usize = 4096;

/// Any bidirectional byte stream the client can talk IRC over.
pub trait IrcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IrcStream for T {}

/// Settings shared by every connection attempt.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// SOCKS5 proxy host.
    pub proxy_host: String,
    /// SOCKS5 proxy port.
    pub proxy_port: u16,
    /// Bound on TCP connect plus proxy and TLS handshakes.
    pub connect_timeout: Duration,
    /// Certificate checking for TLS servers.
    pub tls_verify: TlsVerify,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            proxy_host: "127.0.0.1".to_string(),
            proxy_port: 9050,
            connect_timeout: Duration::from_secs(30),
            tls_verify: TlsVerify::Verify,
        }
    }
}

/// An open connection to a server.
pub struct Transport {
    stream: Box<dyn IrcStream>,
    tls: bool,
}

impl Transport {
    /// Open a connection to `target`, through the proxy when `use_proxy`.
    ///
    /// Proxy failures never fall back to a direct connection.
    pub async fn open(
        target: &ServerEntry,
        use_proxy: bool,
        cfg: &TransportConfig,
    ) -> Result<Self, TransportError> {
        tokio::time::timeout(cfg.connect_timeout, Self::open_layers(target, use_proxy, cfg))
            .await
            .map_err(|_| TransportError::Timeout(cfg.connect_timeout))?
    }

    async fn open_layers(
        target: &ServerEntry,
        use_proxy: bool,
        cfg: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let (host, port) = if use_proxy {
            (cfg.proxy_host.as_str(), cfg.proxy_port)
        } else {
            (target.host.as_str(), target.port)
        };

        debug!(host, port, use_proxy, "opening TCP connection");
        let mut tcp = TcpStream::connect((host, port))
            .await
            .map_err(TransportError::Connect)?;
        if let Err(e) = enable_keepalive(&tcp) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        if use_proxy {
            socks::connect(&mut tcp, &target.host, target.port).await?;
        }

        let transport = if target.tls {
            let stream = tls::connect(tcp, &target.host, cfg.tls_verify).await?;
            Transport {
                stream: Box::new(stream),
                tls: true,
            }
        } else {
            Transport::from_stream(tcp)
        };

        info!(
            server = %target.host,
            port = target.port,
            tls = target.tls,
            proxied = use_proxy,
            "transport open"
        );
        Ok(transport)
    }

    /// Wrap an already connected stream (in-memory pipes in tests).
    pub fn from_stream<S: IrcStream + 'static>(stream: S) -> Self {
        Transport {
            stream: Box::new(stream),
            tls: false,
        }
    }

    /// Whether the stream is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Split into independently owned read and write halves.
    pub fn split(self) -> (TransportReader, TransportWriter) {
        let (read, write) = tokio::io::split(self.stream);
        (TransportReader { inner: read }, TransportWriter { inner: write })
    }
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

/// Read half of a [`Transport`].
pub struct TransportReader {
    inner: ReadHalf<Box<dyn IrcStream>>,
}

impl TransportReader {
    /// Read up to `max_bytes`. `None` means the peer closed the stream.
    pub async fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; max_bytes.max(1)];
        let n = self.inner.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

/// Write half of a [`Transport`].
pub struct TransportWriter {
    inner: WriteHalf<Box<dyn IrcStream>>,
}

impl TransportWriter {
    /// Write one already framed line and flush it.
    pub async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.inner.write_all(line).await?;
        self.inner.flush().await
    }

    /// Close the write direction.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
