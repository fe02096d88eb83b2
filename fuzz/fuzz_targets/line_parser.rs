//! Fuzz target for inbound line handling
//!
//! Raw bytes go through the framer and every resulting line is parsed and
//! classified. None of these steps may panic.

#![no_main]

use anon_irc::event::ProtocolEvent;
use anon_irc::framer::LineFramer;
use anon_irc::Message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut framer = LineFramer::new().with_max_len(512);
    // Split at the first byte's value so chunk boundaries vary too.
    let cut = data.first().map_or(0, |b| *b as usize).min(data.len());
    let (head, tail) = data.split_at(cut);

    let mut lines: Vec<String> = framer.feed(head).collect();
    lines.extend(framer.feed(tail));

    for line in lines {
        let _ = line.parse::<Message>();
        let _ = ProtocolEvent::from_line(&line);
    }
});
