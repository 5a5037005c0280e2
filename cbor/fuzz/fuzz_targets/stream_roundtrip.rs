#![no_main]

use cbor_codec::{DecodeOptions, EncodeOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decode_options = DecodeOptions::default();
    let encode_options = EncodeOptions::default();

    let Ok(value) = cbor_codec::decode(data, &decode_options) else {
        return;
    };
    let Ok(encoded) = cbor_codec::encode(&value, &encode_options) else {
        return;
    };

    // Once re-encoded, the output is a fixed point
    let value = cbor_codec::decode(&encoded, &decode_options).expect("Re-encoded data must decode");
    let again = cbor_codec::encode(&value, &encode_options).expect("Decoded value must encode");
    assert_eq!(encoded, again);
});
