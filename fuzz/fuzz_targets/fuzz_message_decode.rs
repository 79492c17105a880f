//! Fuzz target: `TransportMessage::decode`
//!
//! Feeds arbitrary companion frames to the decoder. Anything that
//! decodes must re-encode to a full frame that decodes to the same
//! message.
//!
//! cargo fuzz run fuzz_message_decode

#![no_main]

use bleconsole::transport::message::{FRAME_LEN, MAX_PAYLOAD, TransportMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(msg) = TransportMessage::decode(data) else {
        return;
    };
    assert!(msg.payload.len() <= MAX_PAYLOAD);

    let frame = msg.encode();
    assert_eq!(frame.len(), FRAME_LEN);
    assert_eq!(TransportMessage::decode(&frame).as_ref(), Ok(&msg));
});
