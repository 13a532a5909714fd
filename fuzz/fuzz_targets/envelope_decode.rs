#![no_main]

use libfuzzer_sys::fuzz_target;
use statekit_core::{SealedEnvelope, StateCipher};

fuzz_target!(|data: &[u8]| {
    // Attack: arbitrary bytes and strings read back from a hostile store
    // Validates: no panics, and nothing but a genuine envelope ever opens

    let cipher = StateCipher::new("fuzz-secret");

    if let Ok(text) = std::str::from_utf8(data) {
        // Anything that decrypts must have come from a real seal, which the
        // fuzzer cannot forge without the secret
        assert!(
            cipher.decrypt(text).is_err(),
            "forged envelope decrypted: {:?}",
            text
        );
    }

    if let Ok(envelope) = SealedEnvelope::from_bytes(data) {
        // Parsing must be lossless
        assert_eq!(envelope.to_bytes(), data, "envelope split must be lossless");
        assert!(cipher.open(&envelope).is_err());
    }
});
