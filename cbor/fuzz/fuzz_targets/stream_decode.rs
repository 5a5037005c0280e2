#![no_main]

use cbor_codec::{DecodeOptions, Decoder};
use libfuzzer_sys::fuzz_target;

fn decode_all(chunks: &[&[u8]]) -> Result<Vec<cbor_codec::Value>, cbor_codec::Error> {
    let mut decoder = Decoder::new(DecodeOptions::default())?;
    let mut values = Vec::new();
    for chunk in chunks {
        decoder.add(chunk)?;
        while decoder.process()? {
            values.extend(decoder.take_value());
        }
    }
    Ok(values)
}

fuzz_target!(|data: &[u8]| {
    let Some((&split, data)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(data.len());

    // Feeding the input in two pieces must not change the outcome
    let whole = decode_all(&[data]);
    let pieces = decode_all(&[&data[..split], &data[split..]]);
    assert_eq!(format!("{whole:?}"), format!("{pieces:?}"));
});
