//! Property-based tests for line framing and inbound parsing.
//!
//! Verifies that:
//! 1. Feeding arbitrary bytes never panics
//! 2. CRLF-terminated lines survive arbitrary chunk boundaries intact
//! 3. Invalid UTF-8 is replaced, never rejected
//! 4. Any decoded line classifies into an event without panicking

use anon_irc::event::ProtocolEvent;
use anon_irc::framer::LineFramer;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

/// A line body without CR or LF.
fn line_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n]{0,120}").expect("valid regex")
}

/// Typical server traffic.
fn irc_line_strategy() -> impl Strategy<Value = String> {
    let nick = prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,8}").expect("valid regex").boxed();
    let chan = prop::string::string_regex("#[a-z0-9_-]{1,20}").expect("valid regex").boxed();
    let text = prop::string::string_regex("[^\r\n\0]{0,80}").expect("valid regex").boxed();

    prop_oneof![
        (nick.clone(), chan.clone(), text.clone())
            .prop_map(|(n, c, t)| format!(":{}!u@h PRIVMSG {} :{}", n, c, t)),
        (nick.clone(), chan.clone()).prop_map(|(n, c)| format!(":{}!u@h JOIN {}", n, c)),
        text.clone().prop_map(|t| format!("PING :{}", t)),
        (nick.clone(), chan, 0u32..100_000, text.clone())
            .prop_map(|(n, c, u, t)| format!(":srv 322 {} {} {} :{}", n, c, u, t)),
        nick.prop_map(|n| format!("433 * {} :Nickname is already in use", n)),
        text,
    ]
}

fn framed(lines: &[String]) -> Vec<u8> {
    let mut wire = Vec::new();
    for line in lines {
        wire.extend_from_slice(line.as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    wire
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn feed_never_panics(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..16)) {
        let mut framer = LineFramer::new();
        for chunk in &chunks {
            for line in framer.feed(chunk) {
                prop_assert!(!line.contains('\n'));
            }
        }
    }

    #[test]
    fn split_points_do_not_change_lines(
        lines in prop::collection::vec(line_strategy(), 1..12),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let wire = framed(&lines);
        let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(wire.len() + 1)).collect();
        offsets.push(0);
        offsets.push(wire.len());
        offsets.sort_unstable();
        offsets.dedup();

        let mut framer = LineFramer::new();
        let mut got = Vec::new();
        for pair in offsets.windows(2) {
            got.extend(framer.feed(&wire[pair[0]..pair[1]]));
        }

        prop_assert_eq!(got, lines);
        prop_assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn invalid_utf8_is_replaced(prefix in "[a-z]{0,10}", suffix in "[a-z]{0,10}", bad in 0x80u8..=0xBF) {
        let mut wire = prefix.clone().into_bytes();
        wire.push(bad);
        wire.extend_from_slice(suffix.as_bytes());
        wire.extend_from_slice(b"\r\n");

        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.feed(&wire).collect();
        prop_assert_eq!(lines, vec![format!("{}\u{FFFD}{}", prefix, suffix)]);
    }

    #[test]
    fn lines_always_classify(line in irc_line_strategy()) {
        let wire = framed(&[line.clone()]);
        let mut framer = LineFramer::new();
        let decoded: Vec<String> = framer.feed(&wire).collect();
        prop_assert_eq!(decoded.len(), 1);

        let event = ProtocolEvent::from_line(&decoded[0]);
        if line.trim().is_empty() {
            prop_assert!(event.is_none());
        } else {
            prop_assert!(event.is_some());
        }
    }

    #[test]
    fn ping_token_survives(token in "[a-zA-Z0-9.]{1,32}") {
        let event = ProtocolEvent::from_line(&format!("PING :{}", token));
        prop_assert_eq!(event, Some(ProtocolEvent::Ping { token }));
    }

    #[test]
    fn encode_is_single_line(text in any::<String>()) {
        let bytes = LineFramer::encode(&text);
        prop_assert!(bytes.ends_with(b"\r\n"));
        let body = &bytes[..bytes.len() - 2];
        prop_assert!(!body.contains(&b'\r') && !body.contains(&b'\n'));
    }
}
