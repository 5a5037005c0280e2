#![cfg(test)]

use cbor_codec::{DecodeOptions, Decoder, edn};
use std::io::Read;

fn replay(name: &str, f: impl Fn(&[u8])) {
    match std::fs::read_dir(format!("./corpus/{name}")) {
        Err(e) => {
            eprintln!(
                "Failed to open dir: {e}, curr dir: {}",
                std::env::current_dir().unwrap().to_string_lossy()
            );
        }
        Ok(dir) => {
            for entry in dir.flatten() {
                let path = entry.path();
                if path.is_file()
                    && let Ok(mut file) = std::fs::File::open(&path)
                {
                    let mut buffer = Vec::new();
                    if file.read_to_end(&mut buffer).is_ok() {
                        f(&buffer);
                    }
                }
            }
        }
    }
}

#[test]
fn test_decode() {
    replay("decode", |data| {
        if let Ok(value) = cbor_codec::decode(data, &DecodeOptions::default()) {
            _ = format!("{value:?}");
        }
        assert!(edn::to_diagnostic(data, &DecodeOptions::default()).is_ok());
    });
}

#[test]
fn test_stream_decode() {
    replay("stream_decode", |data| {
        let mut decoder = Decoder::new(DecodeOptions::default()).unwrap();
        for b in data {
            if decoder.add(&[*b]).is_err() {
                return;
            }
            loop {
                match decoder.process() {
                    Ok(true) => _ = decoder.take_value(),
                    Ok(false) => break,
                    Err(_) => return,
                }
            }
        }
    });
}
