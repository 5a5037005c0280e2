/*!
Well-known tag numbers and the conversions between tagged content and the semantic
[`Value`] variants.
*/

use super::*;
use alloc::format;
use core::fmt::Write;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const DATETIME: u64 = 0;
pub const EPOCH: u64 = 1;
pub const POSITIVE_BIGNUM: u64 = 2;
pub const NEGATIVE_BIGNUM: u64 = 3;
pub const DECIMAL: u64 = 4;
pub const BIGFLOAT: u64 = 5;
pub const EXPECT_BASE64URL: u64 = 21;
pub const EXPECT_BASE64: u64 = 22;
pub const EXPECT_BASE16: u64 = 23;
pub const EMBEDDED_CBOR: u64 = 24;
pub const STRING_REF: u64 = 25;
pub const SHAREABLE: u64 = 28;
pub const SHARED_REF: u64 = 29;
pub const URI: u64 = 32;
pub const BASE64URL: u64 = 33;
pub const BASE64: u64 = 34;
pub const REGEXP: u64 = 35;
pub const MIME: u64 = 36;
pub const STRING_REF_NAMESPACE: u64 = 256;
pub const SELF_DESCRIBE: u64 = 55799;

/// The self-describe tag as written on the wire.
pub const SELF_DESCRIBE_PREFIX: [u8; 3] = [0xD9, 0xD9, 0xF7];

/// Which groups of tags are mapped to semantic values.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Groups {
    pub datetime: bool,
    pub bignum: bool,
    pub decimal: bool,
    pub uri: bool,
}

impl From<&DecodeOptions> for Groups {
    fn from(options: &DecodeOptions) -> Self {
        Self {
            datetime: options.datetime,
            bignum: options.bignum,
            decimal: options.decimal,
            uri: options.uri,
        }
    }
}

impl From<&EncodeOptions> for Groups {
    fn from(options: &EncodeOptions) -> Self {
        Self {
            datetime: options.datetime,
            bignum: options.bignum,
            decimal: options.decimal,
            uri: options.uri,
        }
    }
}

/// Converts decoded tag content into a semantic value.
///
/// `content` is the raw decoded item, before any native string or float conversion.
/// Returns `None` when the tag is not interpreted with the enabled groups.
pub(crate) fn interpret(tag: u64, content: &Value, groups: Groups) -> Result<Option<Value>, Error> {
    let value = match tag {
        DATETIME if groups.datetime => {
            let Value::Text(t) = content else {
                return Err(Error::TagType(tag));
            };
            let s = core::str::from_utf8(t).map_err(|_| Error::TagValue(tag))?;
            Value::DateTime(OffsetDateTime::parse(s, &Rfc3339).map_err(|_| Error::TagValue(tag))?)
        }
        EPOCH if groups.datetime => Value::DateTime(from_epoch(content)?),
        POSITIVE_BIGNUM | NEGATIVE_BIGNUM if groups.bignum => {
            let Value::Bytes(b) = content else {
                return Err(Error::TagType(tag));
            };
            Value::BigNum(BigNum::new(tag == NEGATIVE_BIGNUM, b))
        }
        DECIMAL if groups.decimal => Value::Decimal(fraction(tag, content)?),
        BIGFLOAT if groups.decimal => Value::BigFloat(fraction(tag, content)?),
        URI if groups.uri => {
            let Value::Text(t) = content else {
                return Err(Error::TagType(tag));
            };
            Value::Uri(String::from_utf8(t.clone()).map_err(|_| Error::TagValue(tag))?)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn from_epoch(content: &Value) -> Result<OffsetDateTime, Error> {
    let dt = match content {
        Value::Unsigned(n) => i64::try_from(*n)
            .ok()
            .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok()),
        Value::Negative(n) => i64::try_from(*n)
            .ok()
            .and_then(|n| OffsetDateTime::from_unix_timestamp(-1 - n).ok()),
        Value::Float16(_) | Value::Float32(_) | Value::Float64(_) => content
            .as_f64()
            .filter(|f| f.is_finite())
            .and_then(|f| OffsetDateTime::from_unix_timestamp_nanos((f * 1e9) as i128).ok()),
        _ => return Err(Error::TagType(EPOCH)),
    };
    dt.ok_or(Error::TagValue(EPOCH))
}

fn fraction(tag: u64, content: &Value) -> Result<Fraction, Error> {
    let Value::Array(items) = content else {
        return Err(Error::TagType(tag));
    };
    let [exponent, mantissa] = items.as_slice() else {
        return Err(Error::TagValue(tag));
    };
    let exponent = match exponent {
        Value::Unsigned(_) | Value::Negative(_) => {
            exponent.as_i64().ok_or(Error::TagValue(tag))?
        }
        _ => return Err(Error::TagType(tag)),
    };
    let mantissa = match mantissa {
        Value::Unsigned(n) => BigNum::new(false, &n.to_be_bytes()),
        Value::Negative(n) => BigNum::new(true, &n.to_be_bytes()),
        Value::BigNum(b) => b.clone(),
        _ => return Err(Error::TagType(tag)),
    };
    Ok(Fraction { exponent, mantissa })
}

/// Formats a date/time as an RFC 3339 string with the shortest exact fraction.
pub(crate) fn format_datetime(dt: &OffsetDateTime) -> Result<String, Error> {
    if !(0..=9999).contains(&dt.year()) {
        return Err(Error::UnsupportedValue);
    }
    let (hours, minutes, seconds) = dt.offset().as_hms();
    if seconds != 0 {
        return Err(Error::UnsupportedValue);
    }

    let mut s = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    if dt.nanosecond() != 0 {
        let nanos = format!("{:09}", dt.nanosecond());
        s.push('.');
        s.push_str(nanos.trim_end_matches('0'));
    }
    if dt.offset().is_utc() {
        s.push('Z');
    } else {
        let sign = if dt.offset().is_negative() { '-' } else { '+' };
        write!(
            s,
            "{sign}{:02}:{:02}",
            hours.unsigned_abs(),
            minutes.unsigned_abs()
        )
        .map_err(|_| Error::Internal("date formatting failed"))?;
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use time::{Duration, UtcOffset};

    const ALL: Groups = Groups {
        datetime: true,
        bignum: true,
        decimal: true,
        uri: true,
    };

    #[test]
    fn datetime() {
        let v = interpret(0, &Value::text("2013-03-21T20:04:00Z"), ALL)
            .unwrap()
            .unwrap();
        let Value::DateTime(dt) = v else {
            panic!("Expected a date")
        };
        assert_eq!(dt.unix_timestamp(), 1363896240);
        assert_eq!(format_datetime(&dt).unwrap(), "2013-03-21T20:04:00Z");

        assert_eq!(
            interpret(0, &Value::Unsigned(1), ALL),
            Err(Error::TagType(0))
        );
        assert_eq!(
            interpret(0, &Value::text("yesterday"), ALL),
            Err(Error::TagValue(0))
        );
        assert_eq!(
            interpret(0, &Value::text("yesterday"), Groups { datetime: false, ..ALL }),
            Ok(None)
        );
    }

    #[test]
    fn datetime_formatting() {
        let dt = OffsetDateTime::from_unix_timestamp(1363896240).unwrap() + Duration::milliseconds(500);
        assert_eq!(format_datetime(&dt).unwrap(), "2013-03-21T20:04:00.5Z");

        let offset = UtcOffset::from_hms(-5, -30, 0).unwrap();
        assert_eq!(
            format_datetime(&dt.to_offset(offset)).unwrap(),
            "2013-03-21T14:34:00.5-05:30"
        );
    }

    #[test]
    fn epoch() {
        let v = interpret(1, &Value::Unsigned(1363896240), ALL).unwrap().unwrap();
        let Value::DateTime(dt) = v else {
            panic!("Expected a date")
        };
        assert_eq!(dt.unix_timestamp(), 1363896240);

        let v = interpret(1, &Value::Float64(1363896240.5), ALL).unwrap().unwrap();
        let Value::DateTime(dt) = v else {
            panic!("Expected a date")
        };
        assert_eq!(dt.millisecond(), 500);

        assert_eq!(
            interpret(1, &Value::Float64(f64::NAN), ALL),
            Err(Error::TagValue(1))
        );
        assert_eq!(
            interpret(1, &Value::Unsigned(u64::MAX), ALL),
            Err(Error::TagValue(1))
        );
        assert_eq!(interpret(1, &Value::text("x"), ALL), Err(Error::TagType(1)));
    }

    #[test]
    fn bignum() {
        assert_eq!(
            interpret(2, &Value::bytes([1u8, 0, 0, 0, 0, 0, 0, 0, 0]), ALL),
            Ok(Some(Value::BigNum(BigNum::new(false, &[1, 0, 0, 0, 0, 0, 0, 0, 0]))))
        );
        assert_eq!(interpret(3, &Value::text("x"), ALL), Err(Error::TagType(3)));
    }

    #[test]
    fn decimal() {
        let content = Value::Array(vec![Value::from(-2), Value::from(27315)]);
        assert_eq!(
            interpret(4, &content, ALL),
            Ok(Some(Value::Decimal(Fraction::new(-2, 27315i64))))
        );
        assert_eq!(
            interpret(5, &Value::Array(vec![Value::from(1)]), ALL),
            Err(Error::TagValue(5))
        );
        assert_eq!(
            interpret(4, &Value::Array(vec![Value::Unsigned(u64::MAX), Value::from(1)]), ALL),
            Err(Error::TagValue(4))
        );
        assert_eq!(
            interpret(4, &Value::Array(vec![Value::text("1"), Value::from(1)]), ALL),
            Err(Error::TagType(4))
        );
    }

    #[test]
    fn uri() {
        assert_eq!(
            interpret(32, &Value::text("http://www.example.com"), ALL),
            Ok(Some(Value::Uri("http://www.example.com".into())))
        );
        assert_eq!(interpret(32, &Value::bytes([1u8]), ALL), Err(Error::TagType(32)));
        assert_eq!(interpret(33, &Value::text("AA"), ALL), Ok(None));
    }
}
