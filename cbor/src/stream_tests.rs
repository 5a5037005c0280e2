use super::*;
use alloc::vec;
use hex_literal::hex;

fn decoder(flags: Flags) -> Decoder {
    Decoder::new(DecodeOptions::with_flags(flags)).unwrap()
}

fn expected_map() -> Value {
    Value::map([
        (Value::string("a"), Value::from(1)),
        (Value::string("b"), Value::Array(vec![2.into(), 3.into()])),
    ])
}

#[test]
fn every_split_point() {
    let data = hex!("a2 6161 01 6162 82 02 03");
    for split in 0..=data.len() {
        let mut d = decoder(Flags::TEXT | Flags::KEY_TEXT);
        d.add(&data[..split]).unwrap();
        let early = d.process().unwrap();
        assert_eq!(early, split == data.len(), "split at {split}");
        assert_eq!(d.is_partial(), split > 0 && !early, "split at {split}");

        d.add(&data[split..]).unwrap();
        let late = d.process().unwrap();
        assert!(early || late, "split at {split}");
        assert!(!d.is_partial(), "split at {split}");
        assert_eq!(d.take_value(), Some(expected_map()), "split at {split}");
        assert!(!d.is_partial());
        assert_eq!(d.state(), DecoderState::Idle);
    }
}

#[test]
fn byte_at_a_time() {
    let data = hex!("bf 6161 01 6162 9f 02 03 ff ff 7f 62 6869 61 21 ff");
    let mut d = decoder(Flags::TEXT | Flags::KEY_TEXT);
    let mut values = vec![];
    for b in data {
        d.add(&[b]).unwrap();
        if d.process().unwrap() {
            values.push(d.take_value().unwrap());
        }
    }
    assert_eq!(values, vec![expected_map(), Value::string("hi!")]);
    assert!(!d.is_partial());
}

#[test]
fn states() {
    let mut d = decoder(Flags::default());
    assert_eq!(d.state(), DecoderState::Idle);
    assert!(!d.is_partial());

    d.add(&hex!("82 19")).unwrap();
    assert!(d.is_partial());
    assert!(!d.process().unwrap());
    assert_eq!(d.state(), DecoderState::AwaitingHeader);
    assert_eq!(d.get_buffer(), hex!("19"));

    d.add(&hex!("0100 43 01")).unwrap();
    assert!(!d.process().unwrap());
    assert_eq!(d.state(), DecoderState::AwaitingContent);
    assert!(d.is_partial());

    d.add(&hex!("0203")).unwrap();
    assert!(d.process().unwrap());
    assert_eq!(d.state(), DecoderState::ItemReady);
    assert!(!d.is_partial());
    assert!(d.has_value());
    assert!(!d.is_processing());

    assert_eq!(
        d.get_value(false),
        Some(Value::Array(vec![256.into(), Value::string([1u8, 2, 3])]))
    );
    assert!(d.has_value());
    assert!(d.take_value().is_some());
    assert_eq!(d.state(), DecoderState::Idle);
}

#[test]
fn ready_item_blocks_input() {
    let mut d = decoder(Flags::default());
    d.add(&hex!("01 02")).unwrap();
    assert!(d.process().unwrap());
    // Nothing more is consumed until the item is taken
    assert!(!d.process().unwrap());
    assert_eq!(d.get_buffer(), hex!("02"));
    assert_eq!(d.take_value(), Some(Value::Unsigned(1)));

    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::Unsigned(2)));
    assert!(!d.process().unwrap());
    assert_eq!(d.take_value(), None);
}

#[test]
fn add_range() {
    let data = hex!("00 01 02 03");
    let mut d = decoder(Flags::default());
    d.add_range(&data, -2, None).unwrap();
    assert_eq!(d.get_buffer(), hex!("02 03"));

    d.reset();
    d.add_range(&data, 1, Some(-1)).unwrap();
    assert_eq!(d.get_buffer(), hex!("01 02"));

    d.reset();
    d.add_range(&data, 1, Some(2)).unwrap();
    assert_eq!(d.get_buffer(), hex!("01 02"));

    d.reset();
    d.add_range(&data, 10, None).unwrap();
    d.add_range(&data, -10, Some(1)).unwrap();
    d.add_range(&data, 3, Some(-3)).unwrap();
    assert_eq!(d.get_buffer(), hex!("00"));
}

#[test]
fn errors_are_sticky() {
    let mut d = decoder(Flags::default());
    d.add(&hex!("01 ff")).unwrap();
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::Unsigned(1)));

    let e = Error::Syntax(SyntaxError::BreakUnderflow);
    assert_eq!(d.process(), Err(e.clone()));
    assert_eq!(d.state(), DecoderState::Error);
    assert_eq!(d.error(), Some(&e));
    assert_eq!(d.add(&hex!("01")), Err(e.clone()));
    assert_eq!(d.process(), Err(e));

    d.reset();
    assert_eq!(d.state(), DecoderState::Idle);
    assert_eq!(d.error(), None);
    d.add(&hex!("02")).unwrap();
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::Unsigned(2)));
}

#[test]
fn reset_drops_partial_items() {
    let mut d = decoder(Flags::default());
    d.add(&hex!("9f 01 02")).unwrap();
    assert!(!d.process().unwrap());
    d.reset();
    assert!(!d.is_partial());
    d.add(&hex!("ff")).unwrap();
    assert_eq!(
        d.process(),
        Err(Error::Syntax(SyntaxError::BreakUnderflow))
    );
}

#[test]
fn buffer_limit() {
    let mut d = Decoder::new(DecodeOptions {
        max_size: 4,
        ..Default::default()
    })
    .unwrap();
    d.add(&hex!("43 0102")).unwrap();
    assert_eq!(d.add(&hex!("03 04")), Err(Error::UnsupportedSize));
    assert_eq!(d.state(), DecoderState::Error);
}

#[test]
fn indefinite_limits() {
    let options = DecodeOptions {
        flags: Flags::INT_KEY,
        max_size: 4,
        ..Default::default()
    };

    // Elements are counted as they arrive, not as they are buffered
    let mut d = Decoder::new(options).unwrap();
    for chunk in [&hex!("9f 00 00")[..], &hex!("00 00"), &hex!("ff")] {
        d.add(chunk).unwrap();
        d.process().unwrap();
    }
    assert_eq!(d.take_value(), Some(Value::Array(vec![Value::Unsigned(0); 4])));

    d.add(&hex!("9f 00 00")).unwrap();
    assert!(!d.process().unwrap());
    d.add(&hex!("00 00")).unwrap();
    assert!(!d.process().unwrap());
    d.add(&hex!("00")).unwrap();
    assert_eq!(d.process(), Err(Error::UnsupportedSize));

    let mut d = Decoder::new(options).unwrap();
    for chunk in [&hex!("bf 01 00")[..], &hex!("02 00"), &hex!("03 00"), &hex!("04 00")] {
        d.add(chunk).unwrap();
        assert!(!d.process().unwrap());
    }
    d.add(&hex!("05")).unwrap();
    assert_eq!(d.process(), Err(Error::UnsupportedSize));
}

#[test]
fn self_describe() {
    let mut d = decoder(Flags::default());
    d.add(&hex!("d9")).unwrap();
    assert!(!d.process().unwrap());
    d.add(&hex!("d9f7")).unwrap();
    assert!(!d.process().unwrap());
    d.add(&hex!("01 d9d9f7 02")).unwrap();
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::Unsigned(1)));
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::Unsigned(2)));

    // A second prefix in front of the same item is content
    d.add(&hex!("d9d9f7 d9d9f7 03")).unwrap();
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::tag(tags::SELF_DESCRIBE, 3)));
}

#[test]
fn diagnostic_stream() {
    let mut d = decoder(Flags::EDN);
    d.add(&hex!("82 01")).unwrap();
    assert!(!d.process().unwrap());
    d.add(&hex!("02 f5")).unwrap();
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::text("[1, 2]")));
    assert!(d.process().unwrap());
    assert_eq!(d.take_value(), Some(Value::text("true")));
}

#[test]
fn invalid_options() {
    assert_eq!(
        Decoder::new(DecodeOptions {
            flags: Flags::EDN,
            edn: EdnOptions {
                indent: Indent::Spaces(0),
                ..Default::default()
            },
            ..Default::default()
        })
        .err(),
        Some(Error::InvalidOptions("indent"))
    );
    assert_eq!(
        decoder(Flags::KEY_TEXT).options().flags,
        Flags::KEY_TEXT
    );
}
