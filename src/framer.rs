//! Line framing for the IRC byte stream.
//!
//! [`LineFramer`] accumulates raw socket bytes and yields complete lines.
//! Lines end in CRLF, though a bare LF is accepted too. Decoding never
//! fails: byte sequences that are invalid in the configured encoding are
//! replaced with U+FFFD, so one malformed line from a non-compliant server
//! can never stop the receive loop.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use encoding::Encoding;
use tokio_util::codec::Decoder;
use tracing::warn;

/// Largest unterminated line kept in the buffer before it is emitted as-is.
pub const MAX_LINE_LEN: usize = 8191;

/// Buffers raw transport bytes into decoded protocol lines.
pub struct LineFramer {
    buffer: BytesMut,
    encoding: &'static Encoding,
    fallback: Option<&'static Encoding>,
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create a UTF-8 framer without a fallback encoding.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            encoding: encoding::UTF_8,
            fallback: None,
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Create a framer for the given encoding labels.
    ///
    /// Bytes that are malformed in `label` are re-decoded with `fallback`
    /// when one is given (for example `windows-1252`, which accepts any byte).
    /// With a UTF-8 primary only the malformed spans go through the fallback,
    /// so valid text on the same line is kept; other primaries re-decode the
    /// whole line. A fallback that accepts every byte means U+FFFD is never
    /// produced.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a label is not a known encoding.
    pub fn with_encoding(label: &str, fallback: Option<&str>) -> io::Result<Self> {
        let lookup = |label: &str| {
            Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Unknown encoding: {}", label),
                )
            })
        };

        Ok(Self {
            encoding: lookup(label)?,
            fallback: fallback.map(lookup).transpose()?,
            ..Self::new()
        })
    }

    /// Override the maximum unterminated line length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.max(1);
        self
    }

    /// Append bytes and iterate over every line they complete.
    ///
    /// A trailing partial line stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(bytes);
        Lines { framer: self }
    }

    /// Number of buffered bytes not yet part of a complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Encode one outgoing line, terminated with CRLF.
    ///
    /// Anything after an embedded line ending is dropped so a single call
    /// can never put two commands on the wire.
    pub fn encode(line: &str) -> Bytes {
        let end = line.find(['\r', '\n']).unwrap_or(line.len());
        let mut dst = BytesMut::with_capacity(end + 2);
        dst.put_slice(line[..end].as_bytes());
        dst.put_slice(b"\r\n");
        dst.freeze()
    }

    fn decode_bytes(&self, raw: &[u8]) -> String {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(raw);
        let Some(fallback) = self.fallback.filter(|_| had_errors) else {
            return text.into_owned();
        };
        if self.encoding != encoding::UTF_8 {
            return fallback.decode_without_bom_handling(raw).0.into_owned();
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    return out;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    let (bad, tail) = after.split_at(e.error_len().unwrap_or(after.len()));
                    out.push_str(&fallback.decode_without_bom_handling(bad).0);
                    rest = tail;
                }
            }
        }
    }

    fn next_line(&mut self, src: &mut BytesMut) -> Option<String> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            return Some(self.decode_bytes(&line[..end]));
        }

        if src.len() >= self.max_len {
            // Cut on a character boundary so the next piece decodes cleanly.
            let mut cut = self.max_len;
            while cut > 1 && cut < src.len() && (src[cut] & 0xC0) == 0x80 && self.max_len - cut < 3 {
                cut -= 1;
            }
            warn!(
                buffered = src.len(),
                limit = self.max_len,
                "line exceeds maximum length, emitting it in pieces"
            );
            let piece = src.split_to(cut);
            self.next_index = 0;
            return Some(self.decode_bytes(&piece));
        }

        self.next_index = src.len();
        None
    }
}

impl Decoder for LineFramer {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<String>> {
        Ok(self.next_line(src))
    }
}

/// Lazy iterator over the lines completed by one [`LineFramer::feed`] call.
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut buffer = std::mem::take(&mut self.framer.buffer);
        let line = self.framer.decode(&mut buffer).ok().flatten();
        self.framer.buffer = buffer;
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_complete_line() {
        let mut framer = LineFramer::new();
        let lines: Vec<_> = framer.feed(b"PING :test\r\n").collect();
        assert_eq!(lines, vec!["PING :test"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_feed_partial_line() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"PING :").count(), 0);
        assert_eq!(framer.pending(), 6);

        let lines: Vec<_> = framer.feed(b"abc\r\n:srv 001").collect();
        assert_eq!(lines, vec!["PING :abc"]);
        assert_eq!(framer.pending(), 8);
    }

    #[test]
    fn test_bare_lf_and_multiple_lines() {
        let mut framer = LineFramer::new();
        let lines: Vec<_> = framer.feed(b"one\ntwo\r\n\r\nthree\n").collect();
        assert_eq!(lines, vec!["one", "two", "", "three"]);
    }

    #[test]
    fn test_crlf_split_between_feeds() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"hello\r").count(), 0);
        let lines: Vec<_> = framer.feed(b"\nworld\r\n").collect();
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut framer = LineFramer::new();
        let lines: Vec<_> = framer.feed(b"PRIVMSG #c :caf\xe9!\r\n").collect();
        assert_eq!(lines, vec!["PRIVMSG #c :caf\u{FFFD}!"]);
    }

    #[test]
    fn test_fallback_encoding() {
        let mut framer = LineFramer::with_encoding("utf-8", Some("windows-1252")).unwrap();
        let lines: Vec<_> = framer.feed(b"caf\xe9\r\nna\xc3\xafve\r\n").collect();
        assert_eq!(lines, vec!["café", "naïve"]);
    }

    #[test]
    fn test_fallback_keeps_valid_utf8_on_same_line() {
        let mut framer = LineFramer::with_encoding("utf-8", Some("windows-1252")).unwrap();
        let lines: Vec<_> = framer.feed(b"na\xc3\xafve caf\xe9 \xe2\x82\xac5\r\n").collect();
        assert_eq!(lines, vec!["naïve café €5"]);
    }

    #[test]
    fn test_fallback_for_non_utf8_primary() {
        let mut framer = LineFramer::with_encoding("shift_jis", Some("windows-1252")).unwrap();
        let lines: Vec<_> = framer.feed(b"\x82\xa0\r\nbad\xff\r\n").collect();
        assert_eq!(lines, vec!["あ", "bad\u{FF}"]);
    }

    #[test]
    fn test_unknown_encoding() {
        let err = LineFramer::with_encoding("klingon", None).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_overlong_line_is_emitted_in_pieces() {
        let mut framer = LineFramer::new().with_max_len(8);
        let lines: Vec<_> = framer.feed(b"abcdefghijkl").collect();
        assert_eq!(lines, vec!["abcdefgh"]);
        let lines: Vec<_> = framer.feed(b"\r\n").collect();
        assert_eq!(lines, vec!["ijkl"]);

        // Complete lines are never cut, whatever their length.
        let lines: Vec<_> = framer.feed(b"0123456789\r\n").collect();
        assert_eq!(lines, vec!["0123456789"]);
    }

    #[test]
    fn test_encode_appends_crlf() {
        assert_eq!(&LineFramer::encode("PONG :test")[..], b"PONG :test\r\n");
    }

    #[test]
    fn test_encode_truncates_embedded_newline() {
        assert_eq!(
            &LineFramer::encode("PRIVMSG #test :hello\r\nQUIT")[..],
            b"PRIVMSG #test :hello\r\n"
        );
    }

    #[test]
    fn test_decoder_trait() {
        let mut framer = LineFramer::new();
        let mut buf = BytesMut::from("NOTICE * :hi\r\nrest");
        assert_eq!(framer.decode(&mut buf).unwrap(), Some("NOTICE * :hi".to_string()));
        assert_eq!(framer.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"rest");
    }
}
