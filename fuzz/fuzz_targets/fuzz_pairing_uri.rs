#![no_main]

use libfuzzer_sys::fuzz_target;
use tessera_qr::PairingCodec;

fuzz_target!(|data: &[u8]| {
    let Ok(uri) = std::str::from_utf8(data) else {
        return;
    };

    // Scanned input must never panic the decoder
    let codec = PairingCodec::default();
    if let Ok(payload) = codec.decode(uri) {
        // Anything accepted re-encodes to an equivalent payload
        let reencoded = codec.encode(&payload).expect("decoded payload re-encodes");
        let again = codec.decode(&reencoded).expect("re-encoded payload decodes");
        assert_eq!(payload, again);
    }
});
