/*!
Per-pass tables for string references (tags 256/25) and shared values (tags 28/29).
*/

use super::*;
use alloc::{sync::Arc, vec};
use hashbrown::HashMap;
use tracing::trace;

/// Whether a string of `len` bytes is long enough to be registered when `index`
/// would be its reference number.
pub(crate) fn worth_referencing(index: usize, len: usize) -> bool {
    let min = if index < 24 {
        3
    } else if index < 1 << 8 {
        4
    } else if index < 1 << 16 {
        5
    } else if (index as u64) < 1 << 32 {
        7
    } else {
        11
    };
    len >= min
}

/// Decoder string reference namespaces; the innermost namespace is last.
#[derive(Debug, Default)]
pub(crate) struct StringRefs {
    namespaces: Vec<Vec<Value>>,
}

impl StringRefs {
    pub fn push(&mut self) {
        trace!("Opening string reference namespace {}", self.namespaces.len());
        self.namespaces.push(Vec::new());
    }

    pub fn pop(&mut self) {
        self.namespaces.pop();
    }

    /// Records a definite-length string in the innermost namespace.
    pub fn record(&mut self, value: &Value) {
        if let Some(ns) = self.namespaces.last_mut() {
            let len = match value {
                Value::Bytes(b) | Value::Text(b) => b.len(),
                _ => return,
            };
            if worth_referencing(ns.len(), len) {
                ns.push(value.clone());
            }
        }
    }

    /// Resolves the content of a string reference tag, charging the copy to `limits`.
    pub fn resolve(&self, content: &Value, limits: &mut Limits) -> Result<Value, Error> {
        let ns = self
            .namespaces
            .last()
            .ok_or(Error::TagSyntax(tags::STRING_REF))?;
        let Value::Unsigned(index) = content else {
            return Err(Error::TagType(tags::STRING_REF));
        };
        let value = usize::try_from(*index)
            .ok()
            .and_then(|i| ns.get(i))
            .ok_or(Error::TagValue(tags::STRING_REF))?;
        limits.charge(footprint(value))?;
        Ok(value.clone())
    }

    pub fn clear(&mut self) {
        self.namespaces.clear();
    }
}

/// Encoder string tables for one namespace.
///
/// Byte and text strings are looked up separately but share one index sequence.
#[derive(Debug, Default)]
pub(crate) struct StringTable {
    bytes: HashMap<Vec<u8>, u64>,
    text: HashMap<Vec<u8>, u64>,
    next: u64,
}

impl StringTable {
    /// Returns the reference for a previously seen string, registering it otherwise.
    pub fn lookup(&mut self, text: bool, data: &[u8]) -> Option<u64> {
        let table = if text { &mut self.text } else { &mut self.bytes };
        if let Some(index) = table.get(data) {
            return Some(*index);
        }
        if worth_referencing(self.next as usize, data.len()) {
            table.insert(data.to_vec(), self.next);
            self.next += 1;
        }
        None
    }

    pub fn len(&self) -> u64 {
        self.next
    }
}

/// Decoder slots for shareable values.
///
/// A slot is reserved when its tag opens and filled when the content completes, so
/// a reference to an unfilled slot points at one of its own ancestors.
#[derive(Debug, Default)]
pub(crate) struct SharedSlots {
    slots: Vec<Option<(Value, u64)>>,
}

impl SharedSlots {
    pub fn reserve(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    pub fn fill(&mut self, slot: usize, value: &Value) {
        trace!("Filling shared slot {slot}");
        if let Some(s) = self.slots.get_mut(slot) {
            *s = Some((value.clone(), footprint(value)));
        }
    }

    /// Resolves the content of a shared reference tag, charging the copy to `limits`.
    pub fn resolve(&self, content: &Value, limits: &mut Limits) -> Result<Value, Error> {
        let Value::Unsigned(index) = content else {
            return Err(Error::TagType(tags::SHARED_REF));
        };
        match usize::try_from(*index).ok().and_then(|i| self.slots.get(i)) {
            None => Err(Error::TagValue(tags::SHARED_REF)),
            Some(None) => Err(Error::Recursion),
            Some(Some((value, size))) => {
                limits.charge(*size)?;
                Ok(value.clone())
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// The cost of copying `value`: one unit per node plus its string and bignum bytes.
///
/// A [`Value::Shareable`] costs one unit, since cloning it only bumps a count.
pub(crate) fn footprint(value: &Value) -> u64 {
    let mut total = 0u64;
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        let bytes = match value {
            Value::Bytes(b) | Value::Text(b) | Value::String(b) => b.len(),
            Value::Uri(s) => s.len(),
            Value::BigNum(b) => b.magnitude().len(),
            Value::Decimal(f) | Value::BigFloat(f) => f.mantissa.magnitude().len(),
            Value::Array(items) => {
                pending.extend(items);
                0
            }
            Value::Map(entries) => {
                for (k, v) in entries {
                    pending.push(k);
                    pending.push(v);
                }
                0
            }
            Value::Tag(_, content) => {
                pending.push(content);
                0
            }
            _ => 0,
        };
        total = total.saturating_add(1 + bytes as u64);
    }
    total
}

/// Encoder registry of shareable values, keyed by allocation.
#[derive(Debug, Default)]
pub(crate) struct SharedTable {
    seen: HashMap<usize, u64>,
    next: u64,
}

impl SharedTable {
    /// Returns the reference of an already written value, registering it otherwise.
    pub fn lookup(&mut self, value: &Arc<Value>) -> Option<u64> {
        let addr = Arc::as_ptr(value) as usize;
        if let Some(index) = self.seen.get(&addr) {
            return Some(*index);
        }
        self.seen.insert(addr, self.next);
        self.next += 1;
        None
    }

    /// Accounts for a shareable tag written directly by the caller.
    pub fn skip(&mut self) {
        self.next += 1;
    }
}
