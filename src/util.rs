//! Helpers for IRC names and message length limits.

/// Maximum length of an IRC line, CRLF included.
pub const MAX_MESSAGE_BODY: usize = 512;

/// Room left for the `:nick!user@host ` prefix the server adds when relaying.
const RELAY_PREFIX_RESERVE: usize = 100;

/// Characters that start a channel name.
const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// Whether `target` names a channel rather than a user.
pub fn is_channel(target: &str) -> bool {
    target.starts_with(CHANNEL_PREFIXES)
}

/// Normalize user input into a channel name, adding `#` when missing.
///
/// ```
/// use anon_irc::util::channel_name;
///
/// assert_eq!(channel_name("rust"), "#rust");
/// assert_eq!(channel_name(" #rust "), "#rust");
/// assert_eq!(channel_name("&local"), "&local");
/// ```
pub fn channel_name(input: &str) -> String {
    let name = input.trim();
    if is_channel(name) {
        name.to_string()
    } else {
        format!("#{}", name)
    }
}

/// Truncates a string to at most `max_bytes` bytes without breaking
/// a multi-byte UTF-8 codepoint at the end.
///
/// ```
/// use anon_irc::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
/// assert_eq!(truncate_utf8_safe("Hello 👋 World", 8), "Hello ");
/// assert_eq!(truncate_utf8_safe("hi", 10), "hi");
/// ```
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Bytes of text that fit in one `PRIVMSG <target> :<text>` line.
pub fn privmsg_text_budget(target: &str) -> usize {
    // "PRIVMSG " + target + " :" + CRLF
    let overhead = 8 + target.len() + 2 + 2;
    MAX_MESSAGE_BODY
        .saturating_sub(overhead + RELAY_PREFIX_RESERVE)
        .max(4)
}

/// Splits a long message into chunks of at most `max_bytes` bytes
/// without breaking multi-byte UTF-8 characters.
///
/// `max_bytes` below 4 is raised to 4 so every chunk holds a character.
///
/// ```
/// use anon_irc::util::split_message;
///
/// let chunks: Vec<_> = split_message("Hello World! This is a test.", 10).collect();
/// assert_eq!(chunks, vec!["Hello Worl", "d! This is", " a test."]);
/// ```
pub fn split_message(s: &str, max_bytes: usize) -> impl Iterator<Item = &str> {
    SplitMessage {
        remaining: s,
        max_bytes: max_bytes.max(4),
    }
}

struct SplitMessage<'a> {
    remaining: &'a str,
    max_bytes: usize,
}

impl<'a> Iterator for SplitMessage<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let chunk = truncate_utf8_safe(self.remaining, self.max_bytes);
        self.remaining = &self.remaining[chunk.len()..];
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_detection() {
        assert!(is_channel("#rust"));
        assert!(is_channel("&local"));
        assert!(!is_channel("nick"));
        assert!(!is_channel(""));
    }

    #[test]
    fn test_channel_name_normalizes() {
        assert_eq!(channel_name("foo"), "#foo");
        assert_eq!(channel_name("#foo"), "#foo");
    }

    #[test]
    fn test_truncate_utf8_safe_multibyte() {
        let s = "café";
        assert_eq!(truncate_utf8_safe(s, 4), "caf");
        assert_eq!(truncate_utf8_safe(s, 5), "café");

        let s = "Hi👋";
        assert_eq!(truncate_utf8_safe(s, 3), "Hi");
        assert_eq!(truncate_utf8_safe("hello", 0), "");
    }

    #[test]
    fn test_split_message() {
        let chunks: Vec<_> = split_message("日本語テスト", 6).collect();
        assert_eq!(chunks, vec!["日本", "語テ", "スト"]);

        let chunks: Vec<_> = split_message("", 5).collect();
        assert!(chunks.is_empty());

        // Tiny limits still make progress.
        let chunks: Vec<_> = split_message("👋👋", 1).collect();
        assert_eq!(chunks, vec!["👋", "👋"]);
    }

    #[test]
    fn test_privmsg_budget() {
        assert_eq!(privmsg_text_budget("#test"), 512 - (8 + 5 + 2 + 2) - 100);
        assert_eq!(privmsg_text_budget(&"#".repeat(600)), 4);
    }
}
