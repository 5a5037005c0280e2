/*!
Assembles [`Value`] trees from the token stream.

The builder keeps an explicit stack of open containers, so a partially decoded item
survives between calls and nesting depth never touches the call stack.
*/

use super::*;
use alloc::sync::Arc;
use hashbrown::HashMap;
use refs::{SharedSlots, StringRefs};
use tags::Groups;
use token::Token;
use tracing::trace;

/// A consumer of tokens that produces one value per top-level item.
pub(crate) trait Build {
    /// Feeds one token, returning the item it completes, if any.
    fn push(&mut self, token: Token<'_>) -> Result<Option<Value>, Error>;

    /// True when no item is partially built.
    fn is_empty(&self) -> bool;

    fn reset(&mut self);
}

#[derive(Debug)]
enum TagKind {
    Plain,
    Namespace,
    StringRef,
    Shareable(usize),
    SharedRef,
}

#[derive(Debug)]
enum Frame {
    Array {
        items: Vec<Value>,
        remaining: Option<u64>,
    },
    Map {
        entries: Vec<(Value, Value)>,
        index: HashMap<Value, usize>,
        key: Option<Value>,
        remaining: Option<u64>,
    },
    Tag {
        tag: u64,
        kind: TagKind,
    },
    Chunks {
        text: bool,
        data: Vec<u8>,
    },
}

pub(crate) struct ValueBuilder {
    flags: Flags,
    groups: Groups,
    string_ref: bool,
    shared_ref: SharedRef,
    limits: Limits,
    stack: Vec<Frame>,
    strings: StringRefs,
    shared: SharedSlots,
}

impl ValueBuilder {
    pub fn new(options: &DecodeOptions) -> Self {
        Self {
            flags: options.flags,
            groups: Groups::from(options),
            string_ref: options.string_ref,
            shared_ref: options.shared_ref,
            limits: Limits::new(options.max_depth, options.max_size),
            stack: Vec::new(),
            strings: StringRefs::default(),
            shared: SharedSlots::default(),
        }
    }

    fn check_text(&self, data: &[u8]) -> Result<(), Error> {
        if !self.flags.contains(Flags::UNSAFE_TEXT) {
            core::str::from_utf8(data).map_err(|_| Error::Utf8)?;
        }
        Ok(())
    }

    fn open_array(&mut self, count: Option<u64>) -> Result<Option<Value>, Error> {
        self.limits.enter()?;
        if count == Some(0) {
            self.limits.leave();
            return self.complete(Value::Array(Vec::new()));
        }
        self.stack.push(Frame::Array {
            items: Vec::with_capacity(capacity(count)),
            remaining: count,
        });
        Ok(None)
    }

    fn open_map(&mut self, count: Option<u64>) -> Result<Option<Value>, Error> {
        self.limits.enter()?;
        if count == Some(0) {
            self.limits.leave();
            return self.complete(Value::Map(Vec::new()));
        }
        self.stack.push(Frame::Map {
            entries: Vec::with_capacity(capacity(count)),
            index: HashMap::new(),
            key: None,
            remaining: count,
        });
        Ok(None)
    }

    fn open_tag(&mut self, tag: u64) -> Result<Option<Value>, Error> {
        self.limits.enter()?;
        let kind = match tag {
            tags::STRING_REF_NAMESPACE if self.string_ref => {
                self.strings.push();
                TagKind::Namespace
            }
            tags::STRING_REF if self.string_ref => TagKind::StringRef,
            tags::SHAREABLE if self.shared_ref != SharedRef::Off => {
                if let Some(Frame::Tag {
                    kind: TagKind::Shareable(_),
                    ..
                }) = self.stack.last()
                {
                    return Err(Error::TagSyntax(tags::SHAREABLE));
                }
                TagKind::Shareable(self.shared.reserve())
            }
            tags::SHARED_REF if self.shared_ref != SharedRef::Off => TagKind::SharedRef,
            _ => TagKind::Plain,
        };
        self.stack.push(Frame::Tag { tag, kind });
        Ok(None)
    }

    fn close_tag(&mut self, tag: u64, kind: TagKind, content: Value) -> Result<Value, Error> {
        match kind {
            TagKind::Namespace => {
                self.strings.pop();
                Ok(content)
            }
            TagKind::StringRef => self.strings.resolve(&content, &mut self.limits),
            TagKind::Shareable(slot) => {
                let mut value = native(content, self.flags);
                if self.shared_ref == SharedRef::Shareable {
                    value = Value::Shareable(Arc::new(value));
                }
                self.shared.fill(slot, &value);
                Ok(value)
            }
            TagKind::SharedRef => self.shared.resolve(&content, &mut self.limits),
            TagKind::Plain => match tags::interpret(tag, &content, self.groups)? {
                Some(value) => Ok(value),
                None => Ok(Value::Tag(tag, Box::new(native(content, self.flags)))),
            },
        }
    }

    fn push_chunk(&mut self, token: Token<'_>) -> Result<Option<Value>, Error> {
        let (is_text, chunk) = match token {
            Token::Bytes(b) => (false, b),
            Token::Text(t) => (true, t),
            Token::Break => {
                let Some(Frame::Chunks { text, data }) = self.stack.pop() else {
                    return Err(Error::Internal("missing string frame"));
                };
                return self.complete(if text {
                    Value::Text(data)
                } else {
                    Value::Bytes(data)
                });
            }
            Token::BytesStart | Token::TextStart => {
                return Err(Error::Syntax(SyntaxError::NestedIndefiniteString));
            }
            _ => return Err(Error::Syntax(SyntaxError::InconsistentStringType)),
        };
        if is_text {
            self.check_text(chunk)?;
        }
        match self.stack.last_mut() {
            Some(Frame::Chunks { text, data }) if *text == is_text => {
                self.limits.check_size((data.len() + chunk.len()) as u64)?;
                data.extend_from_slice(chunk);
                Ok(None)
            }
            _ => Err(Error::Syntax(SyntaxError::InconsistentStringType)),
        }
    }

    fn close_indefinite(&mut self) -> Result<Option<Value>, Error> {
        let value = match self.stack.last_mut() {
            None => return Err(Error::Syntax(SyntaxError::BreakUnderflow)),
            Some(Frame::Array {
                items,
                remaining: None,
            }) => Value::Array(core::mem::take(items)),
            Some(Frame::Map {
                entries,
                key: None,
                remaining: None,
                ..
            }) => Value::Map(core::mem::take(entries)),
            Some(_) => return Err(Error::Syntax(SyntaxError::BreakUnexpected)),
        };
        self.stack.pop();
        self.limits.leave();
        self.complete(value)
    }

    /// Places a finished value into its parent, closing every container it completes.
    fn complete(&mut self, mut value: Value) -> Result<Option<Value>, Error> {
        let flags = self.flags;
        loop {
            match self.stack.last_mut() {
                None => {
                    trace!("Completed {}", value.type_name());
                    self.limits.reset();
                    return Ok(Some(native(value, flags)));
                }
                Some(Frame::Array { items, remaining }) => {
                    if remaining.is_none() {
                        self.limits.check_size(items.len() as u64 + 1)?;
                    }
                    items.push(native(value, flags));
                    if !count_down(remaining) {
                        return Ok(None);
                    }
                    value = Value::Array(core::mem::take(items));
                }
                Some(Frame::Map {
                    entries,
                    index,
                    key,
                    remaining,
                }) => {
                    let Some(k) = key.take() else {
                        if remaining.is_none() {
                            self.limits.check_size(entries.len() as u64 + 1)?;
                        }
                        let k = map_key(value, flags)?;
                        if flags.contains(Flags::MAP_NO_DUP_KEY) && index.contains_key(&k) {
                            return Err(Error::DuplicateKey);
                        }
                        *key = Some(k);
                        return Ok(None);
                    };
                    let v = native(value, flags);
                    match index.get(&k) {
                        Some(&i) if !flags.contains(Flags::MAP_AS_ARRAY) => entries[i].1 = v,
                        _ => {
                            index.insert(k.clone(), entries.len());
                            entries.push((k, v));
                        }
                    }
                    if !count_down(remaining) {
                        return Ok(None);
                    }
                    value = Value::Map(core::mem::take(entries));
                }
                Some(Frame::Tag { .. }) => {
                    let Some(Frame::Tag { tag, kind }) = self.stack.pop() else {
                        return Err(Error::Internal("missing tag frame"));
                    };
                    self.limits.leave();
                    value = self.close_tag(tag, kind, value)?;
                    continue;
                }
                Some(Frame::Chunks { .. }) => {
                    return Err(Error::Internal("value inside string chunks"));
                }
            }
            // A counted container has just been filled
            self.stack.pop();
            self.limits.leave();
        }
    }
}

impl Build for ValueBuilder {
    fn push(&mut self, token: Token<'_>) -> Result<Option<Value>, Error> {
        if let Some(Frame::Chunks { .. }) = self.stack.last() {
            return self.push_chunk(token);
        }
        match token {
            Token::Unsigned(n) => self.complete(Value::Unsigned(n)),
            Token::Negative(n) => self.complete(Value::Negative(n)),
            Token::Bytes(b) => {
                let value = Value::Bytes(b.to_vec());
                self.strings.record(&value);
                self.complete(value)
            }
            Token::Text(t) => {
                self.check_text(t)?;
                let value = Value::Text(t.to_vec());
                self.strings.record(&value);
                self.complete(value)
            }
            Token::BytesStart | Token::TextStart => {
                self.stack.push(Frame::Chunks {
                    text: token == Token::TextStart,
                    data: Vec::new(),
                });
                Ok(None)
            }
            Token::Array(count) => self.open_array(count),
            Token::Map(count) => self.open_map(count),
            Token::Tag(tag) => self.open_tag(tag),
            Token::Simple(_) => Err(Error::UnsupportedType),
            Token::False => self.complete(Value::Bool(false)),
            Token::True => self.complete(Value::Bool(true)),
            Token::Null => self.complete(Value::Null),
            Token::Undefined => self.complete(Value::Undefined),
            Token::Float16(bits) => self.complete(Value::Float16(bits)),
            Token::Float32(bits) => self.complete(Value::Float32(bits)),
            Token::Float64(f) => self.complete(Value::Float64(f)),
            Token::Break => self.close_indefinite(),
        }
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.strings.clear();
        self.shared.clear();
        self.limits.reset();
    }
}

/// Decrements a definite count, returning true when it reaches zero.
pub(crate) fn count_down(remaining: &mut Option<u64>) -> bool {
    match remaining {
        Some(n) => {
            *n -= 1;
            *n == 0
        }
        None => false,
    }
}

fn capacity(count: Option<u64>) -> usize {
    count.map_or(0, |n| n.min(64) as usize)
}

/// Applies the native string and float conversions selected by `flags`.
pub(crate) fn native(value: Value, flags: Flags) -> Value {
    match value {
        Value::Bytes(b) if flags.contains(Flags::BYTE) => Value::String(b),
        Value::Text(t) if flags.contains(Flags::TEXT) => Value::String(t),
        Value::Float16(bits) if flags.contains(Flags::FLOAT16) => {
            Value::Float64(half::f16::from_bits(bits).to_f64())
        }
        Value::Float32(bits) if flags.contains(Flags::FLOAT32) => {
            Value::Float64(f32::from_bits(bits) as f64)
        }
        value => value,
    }
}

/// Converts a decoded map key according to the key policy in `flags`.
fn map_key(key: Value, flags: Flags) -> Result<Value, Error> {
    if flags.contains(Flags::MAP_AS_ARRAY) {
        return Ok(native(key, flags));
    }
    let key = match key {
        Value::Unsigned(n) if flags.contains(Flags::INT_KEY) => {
            Value::String(alloc::format!("{n}").into_bytes())
        }
        Value::Negative(n) if flags.contains(Flags::INT_KEY) => {
            Value::String(alloc::format!("{}", -1 - n as i128).into_bytes())
        }
        Value::Bytes(b) if flags.contains(Flags::KEY_BYTE) => Value::String(b),
        Value::Text(t) if flags.contains(Flags::KEY_TEXT) => Value::String(t),
        _ => return Err(Error::UnsupportedKeyType),
    };
    if let Value::String(s) = &key
        && s.first() == Some(&0)
    {
        return Err(Error::UnsupportedKeyValue);
    }
    Ok(key)
}
