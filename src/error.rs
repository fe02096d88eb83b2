//! Error types for the IRC client.
//!
//! Transport-level failures ([`TransportError`], [`Socks5Error`]) are kept
//! separate from the session-level [`ClientError`] that callers of the
//! connection manager see. Malformed bytes from the server are never an
//! error: the line framer substitutes replacement characters instead.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors raised while opening a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// TCP connect or DNS resolution failed.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// SOCKS5 negotiation with the proxy failed.
    #[error("proxy error: {0}")]
    Proxy(#[from] Socks5Error),

    /// TLS setup or handshake failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// Connecting took longer than the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors encountered during the SOCKS5 client handshake.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Socks5Error {
    /// I/O error while talking to the proxy.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The proxy answered with a protocol version other than 5.
    #[error("unsupported protocol version: {0:#04x}")]
    InvalidVersion(u8),

    /// The proxy accepted none of the offered authentication methods.
    #[error("no acceptable authentication method")]
    NoAcceptableMethod,

    /// The proxy picked a method we never offered.
    #[error("unexpected authentication method: {0:#04x}")]
    UnexpectedMethod(u8),

    /// The destination host does not fit in a SOCKS5 domain name field.
    #[error("hostname too long: {0} bytes")]
    HostnameTooLong(usize),

    /// The proxy answered with an unknown address type.
    #[error("invalid address type: {0:#04x}")]
    InvalidAddressType(u8),

    /// The proxy refused the CONNECT request.
    #[error("connect rejected: {0}")]
    Rejected(ReplyCode),
}

/// SOCKS5 reply codes (RFC 1928 section 6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyCode {
    /// 0x01
    GeneralFailure,
    /// 0x02
    NotAllowed,
    /// 0x03
    NetworkUnreachable,
    /// 0x04
    HostUnreachable,
    /// 0x05
    ConnectionRefused,
    /// 0x06
    TtlExpired,
    /// 0x07
    CommandNotSupported,
    /// 0x08
    AddressTypeNotSupported,
    /// Anything else.
    Unknown(u8),
}

impl From<u8> for ReplyCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => Self::GeneralFailure,
            0x02 => Self::NotAllowed,
            0x03 => Self::NetworkUnreachable,
            0x04 => Self::HostUnreachable,
            0x05 => Self::ConnectionRefused,
            0x06 => Self::TtlExpired,
            0x07 => Self::CommandNotSupported,
            0x08 => Self::AddressTypeNotSupported,
            other => Self::Unknown(other),
        }
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GeneralFailure => f.write_str("general SOCKS server failure"),
            Self::NotAllowed => f.write_str("connection not allowed by ruleset"),
            Self::NetworkUnreachable => f.write_str("network unreachable"),
            Self::HostUnreachable => f.write_str("host unreachable"),
            Self::ConnectionRefused => f.write_str("connection refused"),
            Self::TtlExpired => f.write_str("TTL expired"),
            Self::CommandNotSupported => f.write_str("command not supported"),
            Self::AddressTypeNotSupported => f.write_str("address type not supported"),
            Self::Unknown(code) => write!(f, "unknown reply {:#04x}", code),
        }
    }
}

/// Errors encountered when parsing an inbound IRC line.
///
/// These never reach the user: an unparseable line is surfaced as a
/// server notice carrying the raw text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty or whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// Parsing failed with context about what was expected.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: &'static str,
    },
}

/// Errors surfaced by the connection manager and the interactive session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Could not reach or register with the server.
    #[error("connect error: {0}")]
    Connect(String),

    /// SOCKS5 negotiation failed; the connection was aborted.
    #[error("proxy error: {0}")]
    Proxy(String),

    /// Mid-session socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// No Welcome arrived within the registration timeout.
    #[error("registration timed out after {0:?}")]
    RegistrationTimeout(std::time::Duration),

    /// The action needs a joined channel.
    #[error("you are not in a channel")]
    NotInChannel,

    /// The action needs a registered connection.
    #[error("you are not connected to a server")]
    NotConnected,

    /// Empty or whitespace-containing nickname.
    #[error("invalid nickname: {0:?}")]
    InvalidNickname(String),

    /// The server kept rejecting nicknames past the retry ceiling.
    #[error("nickname {nick:?} still in use after {attempts} retries")]
    NickExhausted {
        /// The last nickname the server rejected.
        nick: String,
        /// How many retries were made.
        attempts: u32,
    },

    /// No saved identity with this name.
    #[error("no identity named {0:?}")]
    NotFound(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Proxy(e) => Self::Proxy(e.to_string()),
            other => Self::Connect(other.to_string()),
        }
    }
}

impl ClientError {
    /// Whether this error ends the current connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect(_)
                | Self::Proxy(_)
                | Self::Io(_)
                | Self::RegistrationTimeout(_)
                | Self::NickExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::NickExhausted {
            nick: "anon_____".to_string(),
            attempts: 5,
        };
        assert_eq!(
            format!("{}", err),
            "nickname \"anon_____\" still in use after 5 retries"
        );

        let err = Socks5Error::Rejected(ReplyCode::from(0x05));
        assert_eq!(format!("{}", err), "connect rejected: connection refused");
    }

    #[test]
    fn test_parse_error_display() {
        let err = MessageParseError::ParseContext {
            position: 4,
            context: "parsing IRC command",
        };
        assert_eq!(
            format!("{}", err),
            "parsing failed at position 4: parsing IRC command"
        );
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: ClientError = TransportError::Proxy(Socks5Error::NoAcceptableMethod).into();
        assert!(matches!(err, ClientError::Proxy(_)));

        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err: ClientError = TransportError::Connect(io_err).into();
        match err {
            ClientError::Connect(msg) => assert!(msg.contains("connection refused")),
            other => panic!("Expected Connect variant, got {:?}", other),
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!ClientError::NotInChannel.is_fatal());
        assert!(!ClientError::NotFound("x".into()).is_fatal());
        assert!(ClientError::NickExhausted {
            nick: "n".into(),
            attempts: 1
        }
        .is_fatal());
    }

    #[test]
    fn test_reply_code_mapping() {
        assert_eq!(ReplyCode::from(0x04), ReplyCode::HostUnreachable);
        assert_eq!(ReplyCode::from(0x42), ReplyCode::Unknown(0x42));
        assert_eq!(ReplyCode::from(0x42).to_string(), "unknown reply 0x42");
    }
}
