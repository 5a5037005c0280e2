/*!
The value model.

[`Value`] is an owned tree covering every CBOR data item the codec can produce or
consume, plus the semantic types that well-known tags map to.
*/

use super::*;
use alloc::sync::Arc;
use core::hash::{Hash, Hasher};

/// A CBOR data item.
#[derive(Debug, Clone)]
pub enum Value {
    /// Major type 0.
    Unsigned(u64),

    /// Major type 1: the value is `-1 - n`.
    Negative(u64),

    /// A byte string.
    Bytes(Vec<u8>),

    /// A text string, UTF-8 unless decoded with [`Flags::UNSAFE_TEXT`].
    Text(Vec<u8>),

    /// A native string whose CBOR string type is chosen by [`Flags::BYTE`] / [`Flags::TEXT`].
    String(Vec<u8>),

    Array(Vec<Value>),

    /// Key/value pairs in insertion order.
    Map(Vec<(Value, Value)>),

    Tag(u64, Box<Value>),

    Bool(bool),
    Null,
    Undefined,

    /// A binary16 float, stored as its bit pattern.
    Float16(u16),

    /// A binary32 float, stored as its bit pattern.
    Float32(u32),

    /// The native float; its encoded width is chosen by [`Flags::FLOAT16`] / [`Flags::FLOAT32`].
    Float64(f64),

    /// Tag 0 or 1.
    DateTime(time::OffsetDateTime),

    /// Tag 2 or 3.
    BigNum(BigNum),

    /// Tag 4.
    Decimal(Fraction),

    /// Tag 5.
    BigFloat(Fraction),

    /// Tag 32.
    Uri(String),

    /// Tag 28. Clones of the same `Arc` are written once and then referenced.
    Shareable(Arc<Value>),

    /// A user value serialized through its [`ToCbor`] hook.
    Custom(Custom),

    /// A subtree encoded with [`EncodeParams`] applied over the caller's options.
    /// Never produced by decoding.
    Params(EncodeParams, Box<Value>),
}

/// A user-supplied conversion consulted by the encoder for [`Value::Custom`].
pub trait ToCbor {
    fn to_cbor(&self) -> Result<Value, Error>;
}

/// Wrapper carrying a [`ToCbor`] implementation inside a [`Value`].
///
/// Two `Custom` values are equal when they wrap the same allocation.
#[derive(Clone)]
pub struct Custom(Arc<dyn ToCbor + Send + Sync>);

impl Custom {
    pub fn new<T>(value: T) -> Self
    where
        T: ToCbor + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    pub fn to_cbor(&self) -> Result<Value, Error> {
        self.0.to_cbor()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl core::fmt::Debug for Custom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Custom({:#x})", self.addr())
    }
}

impl PartialEq for Custom {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Custom {}

impl Hash for Custom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state)
    }
}

/// An arbitrary precision integer in CBOR form: the value is `magnitude` when
/// positive and `-1 - magnitude` when negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BigNum {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigNum {
    /// `magnitude` is big-endian; leading zero bytes are dropped.
    pub fn new(negative: bool, magnitude: &[u8]) -> Self {
        let start = magnitude
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(magnitude.len());
        Self {
            negative,
            magnitude: magnitude[start..].to_vec(),
        }
    }

    pub fn from_i128(value: i128) -> Self {
        if value < 0 {
            Self::new(true, &((-1 - value) as u128).to_be_bytes())
        } else {
            Self::new(false, &(value as u128).to_be_bytes())
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    pub fn to_i128(&self) -> Option<i128> {
        if self.magnitude.len() > 16 {
            return None;
        }
        let mut buf = [0u8; 16];
        buf[16 - self.magnitude.len()..].copy_from_slice(&self.magnitude);
        let m = i128::try_from(u128::from_be_bytes(buf)).ok()?;
        Some(if self.negative { -1 - m } else { m })
    }

    /// The magnitude as a `u64`, if it fits.
    pub(crate) fn small_magnitude(&self) -> Option<u64> {
        if self.magnitude.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[8 - self.magnitude.len()..].copy_from_slice(&self.magnitude);
        Some(u64::from_be_bytes(buf))
    }

    /// The equivalent plain integer value, if the magnitude fits in 64 bits.
    pub(crate) fn to_value(&self) -> Option<Value> {
        self.small_magnitude().map(|m| {
            if self.negative {
                Value::Negative(m)
            } else {
                Value::Unsigned(m)
            }
        })
    }
}

/// The `[exponent, mantissa]` pair of a decimal fraction or bigfloat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fraction {
    pub exponent: i64,
    pub mantissa: BigNum,
}

impl Fraction {
    pub fn new(exponent: i64, mantissa: impl Into<BigNum>) -> Self {
        Self {
            exponent,
            mantissa: mantissa.into(),
        }
    }
}

impl From<i128> for BigNum {
    fn from(value: i128) -> Self {
        Self::from_i128(value)
    }
}

impl From<i64> for BigNum {
    fn from(value: i64) -> Self {
        Self::from_i128(value as i128)
    }
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into().into_bytes())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    pub fn string(s: impl Into<Vec<u8>>) -> Self {
        Self::String(s.into())
    }

    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn tag(tag: u64, content: impl Into<Value>) -> Self {
        Self::Tag(tag, Box::new(content.into()))
    }

    pub fn with_params(params: EncodeParams, content: impl Into<Value>) -> Self {
        Self::Params(params, Box::new(content.into()))
    }

    pub fn shareable(content: impl Into<Value>) -> Self {
        Self::Shareable(Arc::new(content.into()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unsigned(_) => "Unsigned Integer",
            Self::Negative(_) => "Negative Integer",
            Self::Bytes(_) => "Byte String",
            Self::Text(_) => "Text String",
            Self::String(_) => "String",
            Self::Array(_) => "Array",
            Self::Map(_) => "Map",
            Self::Tag(..) => "Tag",
            Self::Bool(_) => "Boolean",
            Self::Null => "Null",
            Self::Undefined => "Undefined",
            Self::Float16(_) => "Float16",
            Self::Float32(_) => "Float32",
            Self::Float64(_) => "Float64",
            Self::DateTime(_) => "DateTime",
            Self::BigNum(_) => "BigNum",
            Self::Decimal(_) => "Decimal",
            Self::BigFloat(_) => "BigFloat",
            Self::Uri(_) => "URI",
            Self::Shareable(_) => "Shareable",
            Self::Custom(_) => "Custom",
            Self::Params(..) => "Params",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Unsigned(n) => i64::try_from(*n).ok(),
            Self::Negative(n) => i64::try_from(*n).ok().map(|n| -1 - n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float16(bits) => Some(half::f16::from_bits(*bits).to_f64()),
            Self::Float32(bits) => Some(f32::from_bits(*bits) as f64),
            Self::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text and native strings holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(b) | Self::String(b) => core::str::from_utf8(b).ok(),
            Self::Uri(s) => Some(s),
            _ => None,
        }
    }

    /// Byte and native strings.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) | Self::String(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up a map entry whose key is a string equal to `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unsigned(a), Self::Unsigned(b)) | (Self::Negative(a), Self::Negative(b)) => {
                a == b
            }
            (Self::Bytes(a), Self::Bytes(b))
            | (Self::Text(a), Self::Text(b))
            | (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Tag(t1, a), Self::Tag(t2, b)) => t1 == t2 && a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) | (Self::Undefined, Self::Undefined) => true,
            (Self::Float16(a), Self::Float16(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::BigNum(a), Self::BigNum(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) | (Self::BigFloat(a), Self::BigFloat(b)) => {
                a == b
            }
            (Self::Uri(a), Self::Uri(b)) => a == b,
            (Self::Shareable(a), Self::Shareable(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => a == b,
            (Self::Params(p1, a), Self::Params(p2, b)) => p1 == p2 && a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Unsigned(n) | Self::Negative(n) => n.hash(state),
            Self::Bytes(b) | Self::Text(b) | Self::String(b) => b.hash(state),
            Self::Array(a) => a.hash(state),
            Self::Map(m) => m.hash(state),
            Self::Tag(t, v) => {
                t.hash(state);
                v.hash(state)
            }
            Self::Bool(b) => b.hash(state),
            Self::Null | Self::Undefined => {}
            Self::Float16(f) => f.hash(state),
            Self::Float32(f) => f.hash(state),
            Self::Float64(f) => f.to_bits().hash(state),
            Self::DateTime(d) => d.hash(state),
            Self::BigNum(b) => b.hash(state),
            Self::Decimal(f) | Self::BigFloat(f) => f.hash(state),
            Self::Uri(s) => s.hash(state),
            Self::Shareable(v) => v.hash(state),
            Self::Custom(c) => c.hash(state),
            Self::Params(p, v) => {
                p.hash(state);
                v.hash(state)
            }
        }
    }
}

macro_rules! impl_uint_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Unsigned(value as u64)
                }
            }
        )*
    };
}

impl_uint_from!(u8, u16, u32, u64, usize);

macro_rules! impl_int_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    let value = value as i64;
                    if value >= 0 {
                        Value::Unsigned(value as u64)
                    } else {
                        Value::Negative((-1 - value) as u64)
                    }
                }
            }
        )*
    };
}

impl_int_from!(i8, i16, i32, i64, isize);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<half::f16> for Value {
    fn from(value: half::f16) -> Self {
        Value::Float16(value.to_bits())
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float32(value.to_bits())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<time::OffsetDateTime> for Value {
    fn from(value: time::OffsetDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<BigNum> for Value {
    fn from(value: BigNum) -> Self {
        Value::BigNum(value)
    }
}

impl From<Custom> for Value {
    fn from(value: Custom) -> Self {
        Value::Custom(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}
