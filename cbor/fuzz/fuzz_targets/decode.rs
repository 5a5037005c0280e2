#![no_main]

use cbor_codec::{DecodeOptions, Flags, edn};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = cbor_codec::decode(data, &DecodeOptions::default()) {
        _ = format!("{value:?}");
    }

    let options = DecodeOptions::with_flags(Flags::TEXT | Flags::KEY_TEXT | Flags::INT_KEY);
    _ = cbor_codec::decode(data, &options);

    // Diagnostic output never fails on malformed input
    assert!(edn::to_diagnostic(data, &DecodeOptions::default()).is_ok());
});
