/*!
Reads one CBOR head (and string payload) at a time from a byte buffer.
*/

use super::*;

/// A single item head read from the wire.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'a> {
    Unsigned(u64),
    Negative(u64),
    Bytes(&'a [u8]),
    Text(&'a [u8]),
    BytesStart,
    TextStart,
    Array(Option<u64>),
    Map(Option<u64>),
    Tag(u64),
    Simple(u8),
    False,
    True,
    Null,
    Undefined,
    Float16(u16),
    Float32(u32),
    Float64(f64),
    Break,
}

/// The outcome of a read attempt.
#[derive(Debug, PartialEq)]
pub(crate) enum Step<'a> {
    /// A token and the number of bytes it occupies.
    Ready(Token<'a>, usize),
    /// The head itself is incomplete.
    NeedHeader,
    /// The head is complete but the string payload is not.
    NeedContent,
}

fn parse_uint_minor(minor: u8, data: &[u8]) -> Result<Option<(u64, usize)>, Error> {
    let len = match minor {
        0..=23 => return Ok(Some((minor as u64, 0))),
        24 => 1,
        25 => 2,
        26 => 4,
        27 => 8,
        _ => return Err(Error::MalformedData),
    };
    let Some(bytes) = data.get(..len) else {
        return Ok(None);
    };
    let mut buf = [0u8; 8];
    buf[8 - len..].copy_from_slice(bytes);
    Ok(Some((u64::from_be_bytes(buf), len)))
}

/// Reads the next token from `data`, checking declared sizes against `limits`.
pub(crate) fn read<'a>(data: &'a [u8], limits: &Limits) -> Result<Step<'a>, Error> {
    let Some(&initial) = data.first() else {
        return Ok(Step::NeedHeader);
    };
    let (major, minor) = (initial >> 5, initial & 0x1F);

    if minor == 31 {
        let token = match major {
            2 => Token::BytesStart,
            3 => Token::TextStart,
            4 => Token::Array(None),
            5 => Token::Map(None),
            7 => Token::Break,
            _ => return Err(Error::MalformedData),
        };
        return Ok(Step::Ready(token, 1));
    }

    let Some((val, len)) = parse_uint_minor(minor, &data[1..])? else {
        return Ok(Step::NeedHeader);
    };
    let head = 1 + len;

    let token = match major {
        0 => Token::Unsigned(val),
        1 => Token::Negative(val),
        2 | 3 => {
            limits.check_size(val)?;
            let end = head + val as usize;
            let Some(payload) = data.get(head..end) else {
                return Ok(Step::NeedContent);
            };
            let token = if major == 2 {
                Token::Bytes(payload)
            } else {
                Token::Text(payload)
            };
            return Ok(Step::Ready(token, end));
        }
        4 => {
            limits.check_size(val)?;
            Token::Array(Some(val))
        }
        5 => {
            limits.check_size(val)?;
            Token::Map(Some(val))
        }
        6 => Token::Tag(val),
        _ => match minor {
            20 => Token::False,
            21 => Token::True,
            22 => Token::Null,
            23 => Token::Undefined,
            0..=19 => Token::Simple(minor),
            24 if val < 32 => return Err(Error::MalformedData),
            24 => Token::Simple(val as u8),
            25 => Token::Float16(val as u16),
            26 => Token::Float32(val as u32),
            _ => Token::Float64(f64::from_bits(val)),
        },
    };
    Ok(Step::Ready(token, head))
}
