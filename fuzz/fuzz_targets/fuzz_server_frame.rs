#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Inbound frames are text; anything that is not UTF-8 never reaches the codec.
    if let Ok(frame) = std::str::from_utf8(data) {
        let _ = chatroom_client::codec::decode(frame);
    }
});
