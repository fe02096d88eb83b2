//! Minimal SOCKS5 client handshake (RFC 1928).
//!
//! Only the "no authentication" method and the CONNECT command are
//! supported. The destination is always sent as a domain name so that DNS
//! resolution happens at the proxy.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ReplyCode, Socks5Error};

const SOCKS_VERSION: u8 = 0x05;
const METHOD_NO_AUTH: u8 = 0x00;
const METHOD_NONE_ACCEPTABLE: u8 = 0xFF;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;
const REPLY_SUCCEEDED: u8 = 0x00;

/// Ask the proxy on `stream` to connect to `host:port`.
///
/// On success the stream is a transparent tunnel to the destination.
pub async fn connect<S>(stream: &mut S, host: &str, port: u16) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let host_len = u8::try_from(host.len())
        .ok()
        .filter(|len| *len > 0)
        .ok_or(Socks5Error::HostnameTooLong(host.len()))?;

    // Greeting: one method, no auth.
    stream
        .write_all(&[SOCKS_VERSION, 1, METHOD_NO_AUTH])
        .await?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await?;
    match choice {
        [SOCKS_VERSION, METHOD_NO_AUTH] => {}
        [SOCKS_VERSION, METHOD_NONE_ACCEPTABLE] => return Err(Socks5Error::NoAcceptableMethod),
        [SOCKS_VERSION, other] => return Err(Socks5Error::UnexpectedMethod(other)),
        [version, _] => return Err(Socks5Error::InvalidVersion(version)),
    }

    let mut request = Vec::with_capacity(7 + host.len());
    request.extend_from_slice(&[SOCKS_VERSION, CMD_CONNECT, 0x00, ATYP_DOMAIN, host_len]);
    request.extend_from_slice(host.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&request).await?;
    stream.flush().await?;

    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let [version, reply, _reserved, atyp] = header;
    if version != SOCKS_VERSION {
        return Err(Socks5Error::InvalidVersion(version));
    }
    if reply != REPLY_SUCCEEDED {
        return Err(Socks5Error::Rejected(ReplyCode::from(reply)));
    }

    // Bound address and port; read and discard.
    let addr_len = match atyp {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => stream.read_u8().await? as usize,
        other => return Err(Socks5Error::InvalidAddressType(other)),
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await?;

    debug!(host, port, "SOCKS5 tunnel established");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    /// Plays the proxy side: checks the greeting and request, then sends `reply`.
    async fn fake_proxy<S>(mut proxy: S, method: u8, reply: Vec<u8>) -> Vec<u8>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut greeting = [0u8; 3];
        proxy.read_exact(&mut greeting).await.unwrap();
        assert_eq!(greeting, [5, 1, 0]);
        proxy.write_all(&[5, method]).await.unwrap();
        if method != METHOD_NO_AUTH {
            return Vec::new();
        }

        let mut head = [0u8; 5];
        proxy.read_exact(&mut head).await.unwrap();
        let mut rest = vec![0u8; head[4] as usize + 2];
        proxy.read_exact(&mut rest).await.unwrap();
        proxy.write_all(&reply).await.unwrap();

        let mut request = head.to_vec();
        request.extend(rest);
        request
    }

    #[tokio::test]
    async fn test_connect_sends_domain_request() {
        let (mut client, proxy) = duplex(1024);
        let server = tokio::spawn(fake_proxy(
            proxy,
            METHOD_NO_AUTH,
            vec![5, 0, 0, ATYP_IPV4, 10, 0, 0, 1, 0x1A, 0x0B],
        ));

        connect(&mut client, "irc.example", 6697).await.unwrap();

        let request = server.await.unwrap();
        let mut expected = vec![5, 1, 0, 3, 11];
        expected.extend_from_slice(b"irc.example");
        expected.extend_from_slice(&6697u16.to_be_bytes());
        assert_eq!(request, expected);
    }

    #[tokio::test]
    async fn test_connect_skips_domain_bound_address() {
        let (mut client, proxy) = duplex(1024);
        let mut reply = vec![5, 0, 0, ATYP_DOMAIN, 4];
        reply.extend_from_slice(b"host");
        reply.extend_from_slice(&[0, 80]);
        tokio::spawn(fake_proxy(proxy, METHOD_NO_AUTH, reply));

        assert!(connect(&mut client, "irc.example", 6667).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_reply_is_mapped() {
        let (mut client, proxy) = duplex(1024);
        tokio::spawn(fake_proxy(
            proxy,
            METHOD_NO_AUTH,
            vec![5, 0x05, 0, ATYP_IPV4, 0, 0, 0, 0, 0, 0],
        ));

        let err = connect(&mut client, "irc.example", 6667).await.unwrap_err();
        assert!(matches!(
            err,
            Socks5Error::Rejected(ReplyCode::ConnectionRefused)
        ));
    }

    #[tokio::test]
    async fn test_no_acceptable_method() {
        let (mut client, proxy) = duplex(1024);
        tokio::spawn(fake_proxy(proxy, METHOD_NONE_ACCEPTABLE, Vec::new()));

        let err = connect(&mut client, "irc.example", 6667).await.unwrap_err();
        assert!(matches!(err, Socks5Error::NoAcceptableMethod));
    }

    #[tokio::test]
    async fn test_wrong_version() {
        let (mut client, mut proxy) = duplex(1024);
        tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            proxy.read_exact(&mut greeting).await.unwrap();
            proxy.write_all(&[4, 0]).await.unwrap();
        });

        let err = connect(&mut client, "irc.example", 6667).await.unwrap_err();
        assert!(matches!(err, Socks5Error::InvalidVersion(4)));
    }

    #[tokio::test]
    async fn test_proxy_hangup_is_io_error() {
        let (mut client, proxy) = duplex(1024);
        drop(proxy);

        let err = connect(&mut client, "irc.example", 6667).await.unwrap_err();
        assert!(matches!(err, Socks5Error::Io(_)));
    }

    #[tokio::test]
    async fn test_hostname_too_long() {
        let (mut client, _proxy) = duplex(1024);
        let host = "a".repeat(256);

        let err = connect(&mut client, &host, 6667).await.unwrap_err();
        assert!(matches!(err, Socks5Error::HostnameTooLong(256)));
    }
}
