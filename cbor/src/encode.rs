/*!
Encoding of [`Value`] trees to CBOR.

Integers and lengths always use the shortest head, and containers are always
definite-length.
*/

use super::*;
use refs::{SharedTable, StringTable};
use tags::Groups;
use tracing::debug;

/// Writes values into an owned buffer.
///
/// Each call to [`emit`](Encoder::emit) appends one top-level item. If `emit` fails,
/// the buffer holds an incomplete item and should be discarded; use [`encode`] for
/// all-or-nothing output.
pub struct Encoder {
    data: Vec<u8>,
    options: EncodeOptions,
    groups: Groups,
    limits: Limits,
    strings: Vec<StringTable>,
    shared: SharedTable,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Result<Self, Error> {
        options.validate()?;
        let mut encoder = Self {
            data: Vec::new(),
            groups: Groups::from(&options),
            limits: Limits::new(options.max_depth, usize::MAX),
            options,
            strings: Vec::new(),
            shared: SharedTable::default(),
        };
        if options.flags.contains(Flags::SELF_DESCRIBE) {
            encoder.data.extend(tags::SELF_DESCRIBE_PREFIX);
        }
        Ok(encoder)
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }

    pub fn offset(&self) -> usize {
        self.data.len()
    }

    pub fn emit(&mut self, value: &Value) -> Result<(), Error> {
        if self.options.string_ref == StringRef::On {
            self.emit_namespace(value)
        } else {
            self.emit_value(value)
        }
    }

    fn emit_uint_minor(&mut self, major: u8, val: u64) {
        if val < 24 {
            self.data.push((major << 5) | (val as u8))
        } else if val <= u8::MAX as u64 {
            self.data.push((major << 5) | 24u8);
            self.data.push(val as u8)
        } else if val <= u16::MAX as u64 {
            self.data.push((major << 5) | 25u8);
            self.data.extend((val as u16).to_be_bytes())
        } else if val <= u32::MAX as u64 {
            self.data.push((major << 5) | 26u8);
            self.data.extend((val as u32).to_be_bytes())
        } else {
            self.data.push((major << 5) | 27u8);
            self.data.extend(val.to_be_bytes())
        }
    }

    fn emit_tag_head(&mut self, tag: u64) -> Result<(), Error> {
        self.limits.enter()?;
        self.emit_uint_minor(6, tag);
        Ok(())
    }

    /// Wraps a top-level item in the implicit string reference namespace, which does
    /// not count towards the depth.
    fn emit_namespace(&mut self, value: &Value) -> Result<(), Error> {
        self.emit_uint_minor(6, tags::STRING_REF_NAMESPACE);
        self.strings.push(StringTable::default());
        let r = self.emit_value(value);
        self.strings.pop();
        r
    }

    fn emit_value(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::Unsigned(n) => self.emit_uint_minor(0, *n),
            Value::Negative(n) => self.emit_uint_minor(1, *n),
            Value::Bytes(b) => self.emit_string(false, b)?,
            Value::Text(t) => self.emit_text(t)?,
            Value::String(s) => {
                let flags = self.options.flags;
                if flags.contains(Flags::TEXT) {
                    self.emit_text(s)?
                } else if flags.contains(Flags::BYTE) {
                    self.emit_string(false, s)?
                } else {
                    return Err(Error::InvalidFlags(FlagsError::NoString));
                }
            }
            Value::Array(items) => {
                self.limits.enter()?;
                self.emit_uint_minor(4, items.len() as u64);
                for item in items {
                    self.emit_value(item)?;
                }
                self.limits.leave();
            }
            Value::Map(entries) => {
                self.limits.enter()?;
                self.emit_map(entries)?;
                self.limits.leave();
            }
            Value::Tag(tag, content) => self.emit_tag(*tag, content)?,
            Value::Bool(b) => self.data.push((7 << 5) | if *b { 21 } else { 20 }),
            Value::Null => self.data.push((7 << 5) | 22),
            Value::Undefined => self.data.push((7 << 5) | 23),
            Value::Float16(bits) => self.emit_f16(half::f16::from_bits(*bits)),
            Value::Float32(bits) => {
                let f = f32::from_bits(*bits);
                if self.options.flags.contains(Flags::CDE) {
                    self.emit_shortest(f as f64)
                } else {
                    self.emit_f32(f)
                }
            }
            Value::Float64(f) => self.emit_f64(*f),
            Value::DateTime(dt) => {
                require(self.groups.datetime)?;
                let s = tags::format_datetime(dt)?;
                self.emit_tag_head(tags::DATETIME)?;
                self.emit_string(true, s.as_bytes())?;
                self.limits.leave();
            }
            Value::BigNum(b) => {
                require(self.groups.bignum)?;
                self.emit_bignum(b)?
            }
            Value::Decimal(f) => {
                require(self.groups.decimal)?;
                match f.mantissa.to_value() {
                    Some(v) if f.exponent == 0 => self.emit_value(&v)?,
                    _ => self.emit_fraction(tags::DECIMAL, f)?,
                }
            }
            Value::BigFloat(f) => {
                require(self.groups.decimal)?;
                self.emit_fraction(tags::BIGFLOAT, f)?
            }
            Value::Uri(uri) => {
                require(self.groups.uri)?;
                self.emit_tag_head(tags::URI)?;
                self.emit_string(true, uri.as_bytes())?;
                self.limits.leave();
            }
            Value::Shareable(content) => {
                if self.options.flags.contains(Flags::CDE) {
                    return Err(Error::UnsupportedValue);
                }
                if let Value::Shareable(_) = content.as_ref() {
                    return Err(Error::TagValue(tags::SHAREABLE));
                }
                if self.options.shared_ref
                    && let Some(index) = self.shared.lookup(content)
                {
                    self.emit_tag_head(tags::SHARED_REF)?;
                    self.emit_uint_minor(0, index);
                } else {
                    self.emit_tag_head(tags::SHAREABLE)?;
                    self.emit_value(content)?;
                }
                self.limits.leave();
            }
            Value::Custom(c) => {
                self.limits.enter()?;
                let v = c.to_cbor()?;
                self.emit_value(&v)?;
                self.limits.leave();
            }
            Value::Params(params, content) => self.emit_params(params, content, false)?,
        }
        Ok(())
    }

    /// Encodes `content` with `params` applied, restoring the outer options afterwards.
    fn emit_params(
        &mut self,
        params: &EncodeParams,
        content: &Value,
        key: bool,
    ) -> Result<(), Error> {
        let options = self.options.with_params(params)?;
        self.limits.enter()?;

        let outer = (self.options, self.groups);
        self.options = options;
        self.groups = Groups::from(&options);
        let r = if key {
            self.emit_key(content)
        } else {
            self.emit_value(content)
        };
        (self.options, self.groups) = outer;

        r?;
        self.limits.leave();
        Ok(())
    }

    fn emit_tag(&mut self, tag: u64, content: &Value) -> Result<(), Error> {
        match tag {
            tags::STRING_REF_NAMESPACE if self.options.string_ref != StringRef::Off => {
                self.limits.enter()?;
                self.emit_namespace(content)?;
                self.limits.leave();
                return Ok(());
            }
            tags::STRING_REF if self.options.string_ref != StringRef::Off => {
                let table = self
                    .strings
                    .last()
                    .ok_or(Error::TagSyntax(tags::STRING_REF))?;
                let Value::Unsigned(index) = content else {
                    return Err(Error::TagType(tags::STRING_REF));
                };
                if *index >= table.len() {
                    return Err(Error::TagValue(tags::STRING_REF));
                }
            }
            tags::SHAREABLE if self.options.shared_ref => self.shared.skip(),
            _ => {}
        }
        self.emit_tag_head(tag)?;
        self.emit_value(content)?;
        self.limits.leave();
        Ok(())
    }

    fn emit_text(&mut self, data: &[u8]) -> Result<(), Error> {
        if !self.options.flags.contains(Flags::UNSAFE_TEXT) {
            core::str::from_utf8(data).map_err(|_| Error::Utf8)?;
        }
        self.emit_string(true, data)
    }

    fn emit_string(&mut self, text: bool, data: &[u8]) -> Result<(), Error> {
        if let Some(index) = self
            .strings
            .last_mut()
            .and_then(|table| table.lookup(text, data))
        {
            self.emit_uint_minor(6, tags::STRING_REF);
            self.emit_uint_minor(0, index);
        } else {
            self.emit_uint_minor(if text { 3 } else { 2 }, data.len() as u64);
            self.data.extend_from_slice(data);
        }
        Ok(())
    }

    fn emit_bignum(&mut self, b: &BigNum) -> Result<(), Error> {
        if let Some(v) = b.to_value() {
            return self.emit_value(&v);
        }
        self.emit_tag_head(if b.is_negative() {
            tags::NEGATIVE_BIGNUM
        } else {
            tags::POSITIVE_BIGNUM
        })?;
        self.emit_string(false, b.magnitude())?;
        self.limits.leave();
        Ok(())
    }

    fn emit_fraction(&mut self, tag: u64, f: &Fraction) -> Result<(), Error> {
        self.emit_tag_head(tag)?;
        self.limits.enter()?;
        self.emit_uint_minor(4, 2);
        self.emit_value(&Value::from(f.exponent))?;
        self.emit_bignum(&f.mantissa)?;
        self.limits.leave();
        self.limits.leave();
        Ok(())
    }

    fn emit_map(&mut self, entries: &[(Value, Value)]) -> Result<(), Error> {
        self.emit_uint_minor(5, entries.len() as u64);
        if self.options.flags.contains(Flags::CDE) {
            let mut sorted = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                sorted.push((self.key_bytes(k)?, k, v));
            }
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, k, v) in sorted {
                self.emit_key(k)?;
                self.emit_value(v)?;
            }
        } else {
            for (k, v) in entries {
                self.emit_key(k)?;
                self.emit_value(v)?;
            }
        }
        Ok(())
    }

    /// The encoding of `key` without string or shared references, used for ordering.
    fn key_bytes(&self, key: &Value) -> Result<Vec<u8>, Error> {
        let mut encoder = Encoder {
            data: Vec::new(),
            options: EncodeOptions {
                string_ref: StringRef::Off,
                shared_ref: false,
                ..self.options
            },
            groups: self.groups,
            limits: self.limits.clone(),
            strings: Vec::new(),
            shared: SharedTable::default(),
        };
        encoder.emit_key(key)?;
        Ok(encoder.data)
    }

    fn emit_key(&mut self, key: &Value) -> Result<(), Error> {
        match key {
            Value::Shareable(_) | Value::Custom(_) => Err(Error::UnsupportedKeyType),
            Value::Params(params, content) => self.emit_params(params, content, true),
            Value::String(s) => {
                let flags = self.options.flags;
                if flags.contains(Flags::INT_KEY)
                    && let Some(v) = int_key(s)
                {
                    self.emit_value(&v)
                } else if flags.contains(Flags::KEY_TEXT) {
                    self.emit_text(s)
                } else if flags.contains(Flags::KEY_BYTE) {
                    self.emit_string(false, s)
                } else {
                    Err(Error::InvalidFlags(FlagsError::NoKeyString))
                }
            }
            _ => self.emit_value(key),
        }
    }

    fn emit_f16(&mut self, f: half::f16) {
        self.data.push((7 << 5) | 25);
        self.data.extend(f.to_be_bytes())
    }

    fn emit_f32(&mut self, f: f32) {
        self.data.push((7 << 5) | 26);
        self.data.extend(f.to_be_bytes())
    }

    fn emit_f64(&mut self, f: f64) {
        let flags = self.options.flags;
        let f16 = flags.contains(Flags::FLOAT16);
        let f32 = flags.contains(Flags::FLOAT32);
        if flags.contains(Flags::CDE) || (f16 && f32) {
            self.emit_shortest(f)
        } else if f16 {
            self.emit_f16(half::f16::from_f64(f))
        } else if f32 {
            self.emit_f32(f as f32)
        } else {
            self.data.push((7 << 5) | 27);
            self.data.extend(f.to_be_bytes())
        }
    }

    fn emit_shortest(&mut self, f: f64) {
        if f.is_nan() {
            self.emit_f16(half::f16::NAN)
        } else if let Some(f) = lossless_float_coerce::<half::f16>(f) {
            self.emit_f16(f)
        } else if let Some(f) = lossless_float_coerce::<f32>(f) {
            self.emit_f32(f)
        } else {
            self.data.push((7 << 5) | 27);
            self.data.extend(f.to_be_bytes())
        }
    }
}

fn require(enabled: bool) -> Result<(), Error> {
    if enabled {
        Ok(())
    } else {
        Err(Error::UnsupportedType)
    }
}

fn lossless_float_coerce<T>(value: f64) -> Option<T>
where
    T: num_traits::FromPrimitive + Into<f64> + Copy,
{
    match <T as num_traits::FromPrimitive>::from_f64(value) {
        Some(f) if <T as Into<f64>>::into(f) == value => Some(f),
        _ => None,
    }
}

/// Parses a native string key holding a canonical decimal integer.
fn int_key(s: &[u8]) -> Option<Value> {
    let n: i128 = core::str::from_utf8(s).ok()?.parse().ok()?;
    if alloc::format!("{n}").as_bytes() != s {
        return None;
    }
    if n >= 0 {
        u64::try_from(n).ok().map(Value::Unsigned)
    } else {
        u64::try_from(-1 - n).ok().map(Value::Negative)
    }
}

/// Encodes one value.
///
/// Nothing is returned on failure; the output is all-or-nothing.
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<Vec<u8>, Error> {
    let mut encoder = Encoder::new(*options)?;
    encoder
        .emit(value)
        .inspect_err(|e| debug!("Encoding failed: {e}"))?;
    Ok(encoder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn int_keys() {
        assert_eq!(int_key(b"0"), Some(Value::Unsigned(0)));
        assert_eq!(int_key(b"-1"), Some(Value::Negative(0)));
        assert_eq!(int_key(b"18446744073709551615"), Some(Value::Unsigned(u64::MAX)));
        assert_eq!(int_key(b"-18446744073709551616"), Some(Value::Negative(u64::MAX)));
        assert_eq!(int_key(b"18446744073709551616"), None);
        assert_eq!(int_key(b"01"), None);
        assert_eq!(int_key(b"-0"), None);
        assert_eq!(int_key(b"+1"), None);
        assert_eq!(int_key(b"a"), None);
    }

    #[test]
    fn offset_and_build() {
        let mut e = Encoder::new(EncodeOptions::default()).unwrap();
        e.emit(&Value::from(1)).unwrap();
        e.emit(&Value::Array(vec![])).unwrap();
        assert_eq!(e.offset(), 2);
        assert_eq!(e.build(), vec![0x01, 0x80]);
    }
}
