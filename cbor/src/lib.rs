/*!
A CBOR (RFC 8949) codec.

Values are represented by the [`Value`] tree. [`encode`] and [`decode`] convert a whole
item in one call, while [`Decoder`] accepts input in arbitrary fragments and yields each
top-level item as soon as its last byte arrives.

Both directions support string references (tags 256/25), shared values (tags 28/29),
the self-describe tag and interpretation of the well-known date, bignum, decimal
fraction, bigfloat and URI tags. With [`Flags::EDN`] the decoder produces diagnostic
notation text instead of a value tree.

```
use cbor_codec::{decode, encode, DecodeOptions, EncodeOptions, Value};

let value = Value::map([("a", Value::from(1)), ("b", Value::Array(vec![2.into(), 3.into()]))]);
let data = encode(&value, &EncodeOptions::default()).unwrap();
assert_eq!(data, [0xA2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x82, 0x02, 0x03]);

let options = DecodeOptions::with_flags(cbor_codec::Flags::KEY_TEXT);
let decoded = decode(&data, &options).unwrap();
assert_eq!(decoded.get("a"), Some(&Value::Unsigned(1)));
```
*/
#![no_std]
extern crate alloc;

use alloc::{boxed::Box, string::String, vec::Vec};

pub mod decode;
pub mod edn;
pub mod encode;
pub mod error;
pub mod flags;
pub mod options;
pub mod tags;
pub mod value;

mod build;
mod limits;
mod refs;
mod token;

use limits::Limits;

pub use decode::{Decoder, DecoderState, decode};
pub use encode::{Encoder, encode};
pub use error::{Error, FlagsError, SyntaxError};
pub use flags::Flags;
pub use options::{
    DecodeOptions, EdnOptions, EncodeOptions, EncodeParams, Indent, SharedRef, StringRef,
};
pub use value::{BigNum, Custom, Fraction, ToCbor, Value};



#[cfg(test)]
mod stream_tests;

#[cfg(test)]
mod refs_tests;
