use super::*;
use alloc::{sync::Arc, vec};
use hex_literal::hex;

fn string_refs(mode: StringRef) -> EncodeOptions {
    EncodeOptions {
        string_ref: mode,
        ..Default::default()
    }
}

fn shared_refs(mode: SharedRef) -> DecodeOptions {
    DecodeOptions {
        shared_ref: mode,
        ..Default::default()
    }
}

// From the string reference tag registration (http://cbor.schmorp.de/stringref)
const COCKTAILS: [u8; 73] = hex!(
    "d9 0100 83"
    "a3 44 72616e6b 04 45 636f756e74 19 01a1 44 6e616d65 48 436f636b7461696c"
    "a3 d819 02 45 4261746865 d819 01 19 0138 d819 00 04"
    "a3 d819 02 44 466f6f64 d819 01 19 02b3 d819 00 04"
);

fn cocktail(name: &str, count: u64) -> Value {
    Value::map([
        (Value::string("rank"), Value::from(4)),
        (Value::string("count"), Value::from(count)),
        (Value::string("name"), Value::string(name)),
    ])
}

#[test]
fn string_ref_example() {
    let decoded = decode(&COCKTAILS, &DecodeOptions::default()).unwrap();
    let Value::Array(items) = &decoded else {
        panic!("Expected an array")
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[1].get("name"), Some(&Value::string("Bathe")));
    assert_eq!(items[2].get("rank"), Some(&Value::Unsigned(4)));
    assert_eq!(items[2].get("count"), Some(&Value::Unsigned(691)));

    assert_eq!(items[0], cocktail("Cocktail", 417));

    let encoded = encode(&decoded, &string_refs(StringRef::On)).unwrap();
    assert_eq!(encoded, COCKTAILS);
}

#[test]
fn string_ref_encode() {
    let value = Value::Array(vec!["aaa".into(), "aaa".into(), "aa".into(), "aa".into()]);
    assert_eq!(
        encode(&value, &string_refs(StringRef::On)),
        Ok(hex!("d9 0100 84 63616161 d819 00 626161 626161").to_vec())
    );
    assert_eq!(
        encode(&value, &string_refs(StringRef::Off)),
        Ok(hex!("84 63616161 63616161 626161 626161").to_vec())
    );
    // Explicit mode only deduplicates inside caller namespaces
    assert_eq!(
        encode(&value, &string_refs(StringRef::Explicit)),
        Ok(hex!("84 63616161 63616161 626161 626161").to_vec())
    );
    assert_eq!(
        encode(
            &Value::Array(vec![value.clone(), Value::tag(256, value)]),
            &string_refs(StringRef::Explicit)
        ),
        Ok(hex!(
            "82 84 63616161 63616161 626161 626161"
            "d9 0100 84 63616161 d819 00 626161 626161"
        )
        .to_vec())
    );

    // Byte and text strings with the same content are separate entries
    let value = Value::Array(vec![
        "abc".into(),
        Value::bytes(*b"abc"),
        Value::bytes(*b"abc"),
        "abc".into(),
    ]);
    assert_eq!(
        encode(&value, &string_refs(StringRef::On)),
        Ok(hex!("d9 0100 84 63616263 43616263 d819 01 d819 00").to_vec())
    );

    // Inner namespaces start empty
    let inner = Value::tag(256, Value::Array(vec!["aaa".into()]));
    assert_eq!(
        encode(
            &Value::Array(vec!["aaa".into(), inner]),
            &string_refs(StringRef::On)
        ),
        Ok(hex!("d9 0100 82 63616161 d9 0100 81 63616161").to_vec())
    );
}

#[test]
fn string_ref_round_trip() {
    let value = Value::Array(
        (0..40u64)
            .map(|i| Value::text(alloc::format!("item-{}", i % 7)))
            .collect(),
    );
    let data = encode(&value, &string_refs(StringRef::On)).unwrap();
    assert!(data.len() < encode(&value, &EncodeOptions::default()).unwrap().len());
    assert_eq!(decode(&data, &DecodeOptions::default()), Ok(value));
}

#[test]
fn string_ref_errors() {
    let options = DecodeOptions::default();
    assert_eq!(
        decode(&hex!("d819 00"), &options).map_err(|e| e.code()),
        Err(41)
    );
    assert_eq!(
        decode(&hex!("d9 0100 82 63616161 d819 01"), &options),
        Err(Error::TagValue(tags::STRING_REF))
    );
    assert_eq!(
        decode(&hex!("d9 0100 82 63616161 d819 6130"), &options),
        Err(Error::TagType(tags::STRING_REF))
    );
    // Short strings are never registered
    assert_eq!(
        decode(&hex!("d9 0100 82 626161 d819 00"), &options),
        Err(Error::TagValue(tags::STRING_REF))
    );

    // Without string reference support the tags are plain
    let options = DecodeOptions {
        string_ref: false,
        ..Default::default()
    };
    assert_eq!(
        decode(&hex!("d819 00"), &options),
        Ok(Value::tag(25, 0))
    );

    // The encoder checks caller written references
    assert_eq!(
        encode(&Value::tag(25, 0), &string_refs(StringRef::On)),
        Err(Error::TagValue(tags::STRING_REF))
    );
    assert_eq!(
        encode(&Value::tag(25, 0), &string_refs(StringRef::Explicit)),
        Err(Error::TagSyntax(tags::STRING_REF))
    );
    assert_eq!(
        encode(&Value::tag(25, "0"), &string_refs(StringRef::On)),
        Err(Error::TagType(tags::STRING_REF))
    );
    assert_eq!(
        encode(&Value::tag(25, 0), &string_refs(StringRef::Off)),
        Ok(hex!("d819 00").to_vec())
    );
}

fn repeated_payload(refs: u8) -> Vec<u8> {
    let mut data = vec![0xd9, 0x01, 0x00, 0x81 + refs, 0x58, 24];
    data.extend([b'x'; 24]);
    for _ in 0..refs {
        data.extend(hex!("d819 00"));
    }
    data
}

#[test]
fn string_ref_expansion_limit() {
    let options = DecodeOptions {
        max_size: 64,
        ..Default::default()
    };
    // Each reference copies 24 bytes
    assert_eq!(
        decode(&repeated_payload(2), &options),
        Ok(Value::Array(vec![Value::string([b'x'; 24]); 3]))
    );
    let data = repeated_payload(10);
    assert!(data.len() <= 64);
    assert_eq!(decode(&data, &options), Err(Error::UnsupportedSize));

    // The allowance is per item
    let mut d = Decoder::new(options).unwrap();
    for _ in 0..4 {
        d.add(&repeated_payload(2)).unwrap();
        assert!(d.process().unwrap());
        assert!(d.take_value().is_some());
    }
}

#[test]
fn shared_ref_encode() {
    let shared = Arc::new(Value::Array(vec![1.into(), 2.into()]));
    let value = Value::Array(vec![
        Value::Shareable(shared.clone()),
        Value::Shareable(shared),
    ]);
    let options = EncodeOptions {
        shared_ref: true,
        ..Default::default()
    };
    assert_eq!(
        encode(&value, &options),
        Ok(hex!("82 d81c 820102 d81d 00").to_vec())
    );

    // Caller written shareable tags take a slot too
    let five = Arc::new(Value::from(5));
    let value = Value::Array(vec![
        Value::tag(28, 1),
        Value::Shareable(five.clone()),
        Value::Shareable(five),
    ]);
    assert_eq!(
        encode(&value, &options),
        Ok(hex!("83 d81c 01 d81c 05 d81d 01").to_vec())
    );
}

#[test]
fn shared_ref_decode() {
    let data = hex!("82 d81c 820102 d81d 00");
    let pair = Value::Array(vec![1.into(), 2.into()]);

    assert_eq!(
        decode(&data, &shared_refs(SharedRef::On)),
        Ok(Value::Array(vec![pair.clone(), pair.clone()]))
    );
    assert_eq!(
        decode(&data, &shared_refs(SharedRef::Off)),
        Ok(Value::Array(vec![Value::tag(28, pair.clone()), Value::tag(29, 0)]))
    );

    let decoded = decode(&data, &shared_refs(SharedRef::Shareable)).unwrap();
    let Some([Value::Shareable(a), Value::Shareable(b)]) = decoded.as_array() else {
        panic!("Expected two shareable values")
    };
    assert_eq!(**a, pair);
    assert!(Arc::ptr_eq(a, b));

    // Re-encoding keeps the sharing
    let options = EncodeOptions {
        shared_ref: true,
        ..Default::default()
    };
    assert_eq!(encode(&decoded, &options), Ok(data.to_vec()));

    // Content gets the usual native conversions
    assert_eq!(
        decode(&hex!("d81c 4161"), &shared_refs(SharedRef::On)),
        Ok(Value::string("a"))
    );
}

/// `levels` shareable arrays, each holding two references to the previous one.
fn doubling_chain(levels: u8) -> Vec<u8> {
    let mut data = vec![0x81 + levels, 0xd8, 0x1c, 0x01];
    for k in 1..=levels {
        data.extend([0xd8, 0x1c, 0x82, 0xd8, 0x1d, k - 1, 0xd8, 0x1d, k - 1]);
    }
    data
}

#[test]
fn shared_ref_expansion_limit() {
    let mut options = shared_refs(SharedRef::On);
    options.max_size = 1024;

    let pair = |v: Value| Value::Array(vec![v.clone(), v]);
    let one = Value::Unsigned(1);
    let two = pair(one.clone());
    let four = pair(two.clone());
    assert_eq!(
        decode(&doubling_chain(2), &options),
        Ok(Value::Array(vec![one, two, four]))
    );

    let data = doubling_chain(20);
    assert!(data.len() <= 1024);
    assert_eq!(decode(&data, &options), Err(Error::UnsupportedSize));

    // Shareable values are not copied, so the same chain fits
    options.shared_ref = SharedRef::Shareable;
    let decoded = decode(&data, &options).unwrap();
    assert_eq!(decoded.as_array().map(<[Value]>::len), Some(21));
}

#[test]
fn shared_ref_errors() {
    let options = shared_refs(SharedRef::On);
    assert_eq!(
        decode(&hex!("d81c 81 d81d 00"), &options).map_err(|e| e.code()),
        Err(4)
    );
    assert_eq!(
        decode(&hex!("d81d 00"), &options),
        Err(Error::TagValue(tags::SHARED_REF))
    );
    assert_eq!(
        decode(&hex!("82 d81c 01 d81d 6130"), &options),
        Err(Error::TagType(tags::SHARED_REF))
    );
    assert_eq!(
        decode(&hex!("d81c d81c 01"), &options),
        Err(Error::TagSyntax(tags::SHAREABLE))
    );
}
