/*!
CBOR extended diagnostic notation (EDN) output.

Diagnostic text is produced straight from the token stream, so it shows the encoding
as it is on the wire: indefinite-length items, chunked strings, float widths and
tags are all visible.
*/

use super::*;
use build::{Build, count_down};
use core::fmt::Write;
use token::{Step, Token};

#[derive(Debug)]
enum Frame {
    Array {
        remaining: Option<u64>,
        appended: bool,
    },
    Map {
        remaining: Option<u64>,
        appended: bool,
        is_key: bool,
    },
    Tag {
        wrapped: bool,
    },
    Chunks {
        text: bool,
        appended: bool,
    },
}

pub(crate) struct EdnBuilder {
    options: EdnOptions,
    limits: Limits,
    out: String,
    indent_level: usize,
    stack: Vec<Frame>,
}

impl EdnBuilder {
    pub fn new(options: &DecodeOptions) -> Self {
        Self {
            options: options.edn,
            limits: Limits::new(options.max_depth, options.max_size),
            out: String::new(),
            indent_level: 0,
            stack: Vec::new(),
        }
    }

    fn indent_unit(&self) -> Option<(char, usize)> {
        match self.options.indent {
            Indent::None => None,
            Indent::Spaces(n) => Some((' ', n as usize)),
            Indent::Tab => Some(('\t', 1)),
        }
    }

    fn space(&mut self) {
        if self.options.space {
            self.out.push(' ');
        }
    }

    /// Starts a new line in indented mode; otherwise writes an optional space.
    fn newline(&mut self, space: bool) {
        match self.indent_unit() {
            None => {
                if space {
                    self.space();
                }
            }
            Some((c, _)) => {
                self.out.push('\n');
                self.out.extend(core::iter::repeat_n(c, self.indent_level));
            }
        }
    }

    fn indent(&mut self, space: bool) {
        if let Some((_, n)) = self.indent_unit() {
            self.indent_level += n;
        }
        self.newline(space);
    }

    fn deindent(&mut self) {
        if let Some((_, n)) = self.indent_unit() {
            self.indent_level = self.indent_level.saturating_sub(n);
        }
        self.newline(false);
    }

    /// Writes the separators that follow a finished item, closing every definite
    /// container it completes. Returns true when a top-level item is complete.
    fn item_done(&mut self) -> bool {
        loop {
            match self.stack.last_mut() {
                None => return true,
                Some(Frame::Array {
                    remaining,
                    appended,
                }) => {
                    if !count_down(remaining) {
                        *appended = true;
                        self.out.push(',');
                        self.newline(true);
                        return false;
                    }
                    self.stack.pop();
                    self.limits.leave();
                    self.deindent();
                    self.out.push(']');
                }
                Some(Frame::Map {
                    remaining,
                    appended,
                    is_key,
                }) => {
                    if *is_key {
                        *is_key = false;
                        self.out.push(':');
                        self.space();
                        return false;
                    }
                    if !count_down(remaining) {
                        *appended = true;
                        *is_key = true;
                        self.out.push(',');
                        self.newline(true);
                        return false;
                    }
                    self.stack.pop();
                    self.limits.leave();
                    self.deindent();
                    self.out.push('}');
                }
                Some(Frame::Tag { wrapped }) => {
                    let wrapped = *wrapped;
                    self.stack.pop();
                    self.limits.leave();
                    if wrapped {
                        self.deindent();
                    }
                    self.out.push(')');
                }
                Some(Frame::Chunks { .. }) => return false,
            }
        }
    }

    fn string(&mut self, text: bool, data: &[u8]) -> Result<bool, Error> {
        match self.stack.last_mut() {
            Some(Frame::Chunks {
                text: chunk_text,
                appended,
            }) => {
                if *chunk_text != text {
                    return Err(Error::Syntax(SyntaxError::InconsistentStringType));
                }
                if *appended {
                    self.out.push(',');
                    self.newline(true);
                } else {
                    *appended = true;
                    self.out.push_str("(_");
                    self.indent(true);
                }
            }
            Some(Frame::Tag { wrapped })
                if !text
                    && !*wrapped
                    && self
                        .options
                        .byte_wrap
                        .is_some_and(|w| data.len() > w as usize) =>
            {
                *wrapped = true;
                self.indent(false);
            }
            _ => {}
        }
        if text {
            self.text(data);
        } else {
            self.bytes(data);
        }
        Ok(self.item_done())
    }

    fn bytes(&mut self, data: &[u8]) {
        let wrap = self.options.byte_wrap.map_or(0, |w| w as usize);
        let byte_space = self.options.byte_space;
        self.out.push_str("h'");
        let mut offset = 0;
        for b in data {
            if wrap != 0 && offset == wrap {
                self.out.push('\'');
                self.newline(true);
                self.out.push_str("h'");
                offset = 0;
            } else if byte_space != 0 && offset != 0 {
                for shift in 0..6 {
                    let group = 1 << shift;
                    if byte_space & group != 0 && offset % group as usize == 0 {
                        self.out.push(' ');
                    }
                }
            }
            let _ = write!(self.out, "{b:02x}");
            offset += 1;
        }
        self.out.push('\'');
    }

    fn text(&mut self, data: &[u8]) {
        let out = &mut self.out;
        let mut in_text = true;
        out.push('"');
        for chunk in data.utf8_chunks() {
            let mut chars = chunk.valid().chars().peekable();
            while let Some(c) = chars.next() {
                if !in_text && c.is_ascii_control() {
                    let _ = write!(out, "{:02x}", c as u8);
                    continue;
                }
                let escape = match c {
                    '\\' => Some('\\'),
                    '"' => Some('"'),
                    '\t' => Some('t'),
                    '\r' => Some('r'),
                    '\u{0C}' => Some('f'),
                    '\n' => Some('n'),
                    '\u{08}' => Some('b'),
                    _ => None,
                };
                if let Some(e) = escape {
                    to_text(out, &mut in_text);
                    out.push('\\');
                    out.push(e);
                } else if c.is_ascii_control() {
                    if chars.peek().is_some_and(|n| n.is_ascii_control()) {
                        to_bytes(out, &mut in_text);
                        let _ = write!(out, "{:02x}", c as u8);
                    } else {
                        to_text(out, &mut in_text);
                        let _ = write!(out, "\\u{:04x}", c as u32);
                    }
                } else if is_invisible(c) {
                    to_text(out, &mut in_text);
                    let _ = write!(out, "\\u{:04x}", c as u32);
                } else {
                    to_text(out, &mut in_text);
                    out.push(c);
                }
            }
            if !chunk.invalid().is_empty() {
                to_bytes(out, &mut in_text);
                for b in chunk.invalid() {
                    let _ = write!(out, "{b:02x}");
                }
            }
        }
        out.push(if in_text { '"' } else { '\'' });
    }

    fn float(&mut self, f: f64, repr: String, width: char) -> bool {
        if f.is_nan() {
            self.out.push_str("NaN");
        } else if f.is_infinite() {
            self.out
                .push_str(if f > 0.0 { "Infinity" } else { "-Infinity" });
        } else {
            let (mantissa, exponent) = match repr.split_once('e') {
                Some((m, e)) => (m, Some(e)),
                None => (repr.as_str(), None),
            };
            self.out.push_str(mantissa);
            if !mantissa.contains('.') {
                self.out.push_str(".0");
            }
            if let Some(e) = exponent {
                self.out.push('e');
                if !e.starts_with('-') {
                    self.out.push('+');
                }
                self.out.push_str(e);
            }
        }
        self.out.push('_');
        self.out.push(width);
        self.item_done()
    }

    fn scalar(&mut self, s: &str) -> bool {
        self.out.push_str(s);
        self.item_done()
    }

    fn open_tag(&mut self, tag: u64) -> Result<bool, Error> {
        self.limits.enter()?;
        let _ = write!(self.out, "{tag}(");
        self.stack.push(Frame::Tag { wrapped: false });
        Ok(false)
    }

    fn open_array(&mut self, count: Option<u64>) -> Result<bool, Error> {
        self.limits.enter()?;
        match count {
            Some(0) => {
                self.limits.leave();
                return Ok(self.scalar("[]"));
            }
            Some(_) => {
                self.out.push('[');
                self.indent(false);
            }
            None => {
                self.out.push_str("[_");
                self.indent(true);
            }
        }
        self.stack.push(Frame::Array {
            remaining: count,
            appended: false,
        });
        Ok(false)
    }

    fn open_map(&mut self, count: Option<u64>) -> Result<bool, Error> {
        self.limits.enter()?;
        match count {
            Some(0) => {
                self.limits.leave();
                return Ok(self.scalar("{}"));
            }
            Some(_) => {
                self.out.push('{');
                self.indent(false);
            }
            None => {
                self.out.push_str("{_");
                self.indent(true);
            }
        }
        self.stack.push(Frame::Map {
            remaining: count,
            appended: false,
            is_key: true,
        });
        Ok(false)
    }

    fn close(&mut self) -> Result<bool, Error> {
        let (close, appended) = match self.stack.last() {
            None => return Err(Error::Syntax(SyntaxError::BreakUnderflow)),
            Some(Frame::Chunks { text, appended }) => {
                let (text, appended) = (*text, *appended);
                self.stack.pop();
                if !appended {
                    self.out.push_str(if text { "\"\"_" } else { "''_" });
                } else {
                    self.deindent();
                    self.out.push(')');
                }
                return Ok(self.item_done());
            }
            Some(Frame::Array {
                remaining: None,
                appended,
            }) => (']', *appended),
            Some(Frame::Map {
                remaining: None,
                appended,
                is_key: true,
            }) => ('}', *appended),
            Some(_) => return Err(Error::Syntax(SyntaxError::BreakUnexpected)),
        };
        self.stack.pop();
        self.limits.leave();
        if appended {
            let trimmed = self
                .out
                .trim_end_matches([' ', '\t', '\n', ','])
                .len();
            self.out.truncate(trimmed);
        }
        self.deindent();
        self.out.push(close);
        Ok(self.item_done())
    }

    /// Feeds one token, leaving the text in `out`. Returns true when an item is complete.
    fn push_token(&mut self, token: Token<'_>) -> Result<bool, Error> {
        if let Some(Frame::Chunks { .. }) = self.stack.last() {
            match token {
                Token::Bytes(_) | Token::Text(_) | Token::Break => {}
                Token::BytesStart | Token::TextStart => {
                    return Err(Error::Syntax(SyntaxError::NestedIndefiniteString));
                }
                _ => return Err(Error::Syntax(SyntaxError::InconsistentStringType)),
            }
        }
        match token {
            Token::Unsigned(n) => Ok(self.scalar(&alloc::format!("{n}"))),
            Token::Negative(n) => Ok(self.scalar(&alloc::format!("{}", -1 - n as i128))),
            Token::Bytes(b) => self.string(false, b),
            Token::Text(t) => self.string(true, t),
            Token::BytesStart | Token::TextStart => {
                self.stack.push(Frame::Chunks {
                    text: token == Token::TextStart,
                    appended: false,
                });
                Ok(false)
            }
            Token::Array(count) => self.open_array(count),
            Token::Map(count) => self.open_map(count),
            Token::Tag(tag) => self.open_tag(tag),
            Token::Simple(n) => Ok(self.scalar(&alloc::format!("simple({n})"))),
            Token::False => Ok(self.scalar("false")),
            Token::True => Ok(self.scalar("true")),
            Token::Null => Ok(self.scalar("null")),
            Token::Undefined => Ok(self.scalar("undefined")),
            Token::Float16(bits) => {
                let f = half::f16::from_bits(bits);
                Ok(self.float(f.to_f64(), alloc::format!("{:?}", f32::from(f)), '1'))
            }
            Token::Float32(bits) => {
                let f = f32::from_bits(bits);
                Ok(self.float(f as f64, alloc::format!("{f:?}"), '2'))
            }
            Token::Float64(f) => Ok(self.float(f, alloc::format!("{f:?}"), '3')),
            Token::Break => self.close(),
        }
    }
}

impl Build for EdnBuilder {
    fn push(&mut self, token: Token<'_>) -> Result<Option<Value>, Error> {
        if self.push_token(token)? {
            Ok(Some(Value::Text(core::mem::take(&mut self.out).into_bytes())))
        } else {
            Ok(None)
        }
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn reset(&mut self) {
        self.out.clear();
        self.stack.clear();
        self.indent_level = 0;
        self.limits.reset();
    }
}

fn to_text(out: &mut String, in_text: &mut bool) {
    if !*in_text {
        *in_text = true;
        out.push_str("' \"");
    }
}

fn to_bytes(out: &mut String, in_text: &mut bool) {
    if *in_text {
        *in_text = false;
        out.push_str("\" h'");
    }
}

/// Code points that are escaped even though they are valid text.
fn is_invisible(c: char) -> bool {
    matches!(c,
        '\u{80}'..='\u{9F}'
        | '\u{61C}'
        | '\u{200E}'
        | '\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2028}'
        | '\u{2029}'
        | '\u{2066}'..='\u{2069}')
}

/// Renders one encoded item as diagnostic notation.
///
/// Only invalid options are returned as errors. A decoding failure ends the text with
/// an `/ERROR:code (name)/` comment after whatever was rendered before it.
pub fn to_diagnostic(data: &[u8], options: &DecodeOptions) -> Result<String, Error> {
    options.validate()?;
    options.edn.validate()?;

    let start = options.offset.min(data.len());
    let end = options
        .length
        .map_or(data.len(), |l| start.saturating_add(l).min(data.len()));
    let mut data = &data[start..end];

    let limits = Limits::new(options.max_depth, options.max_size);
    let mut builder = EdnBuilder::new(options);
    let mut stripped = false;
    let error = loop {
        let (token, consumed) = match token::read(data, &limits) {
            Ok(Step::Ready(token, consumed)) => (token, consumed),
            Ok(_) => break Some(Error::TruncatedData),
            Err(e) => break Some(e),
        };
        data = &data[consumed..];
        if token == Token::Tag(tags::SELF_DESCRIBE)
            && !stripped
            && builder.is_empty()
            && !options.flags.contains(Flags::SELF_DESCRIBE)
        {
            stripped = true;
            continue;
        }
        match builder.push_token(token) {
            Ok(false) => {}
            Ok(true) => break (!data.is_empty()).then_some(Error::ExtraneousData),
            Err(e) => break Some(e),
        }
    };

    let mut text = builder.out;
    if let Some(e) = error {
        text.truncate(text.trim_end().len());
        if !text.is_empty() {
            text.push(' ');
        }
        let _ = write!(text, "/ERROR:{} ({})/", e.code(), e.name());
    }
    Ok(text)
}
