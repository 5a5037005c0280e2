/*!
Incremental and one-shot decoding.

A [`Decoder`] buffers whatever bytes it is given and builds values as far as the
buffered input allows. Partially built containers are kept between calls, so input
may be split at any byte boundary.

```
use cbor_codec::{Decoder, DecodeOptions, Value};

let mut decoder = Decoder::new(DecodeOptions::default()).unwrap();
decoder.add(&[0x82, 0x01]).unwrap();
assert!(!decoder.process().unwrap());
assert!(decoder.is_partial());

decoder.add(&[0x02]).unwrap();
assert!(decoder.process().unwrap());
assert_eq!(
    decoder.take_value(),
    Some(Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2)]))
);
```
*/

use super::*;
use build::{Build, ValueBuilder};
use bytes::{Buf, BytesMut};
use token::{Step, Token};
use tracing::debug;

/// The observable state of a [`Decoder`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecoderState {
    /// Nothing buffered and no item in progress.
    Idle,
    /// Waiting for the start (or the rest) of an item head.
    AwaitingHeader,
    /// Waiting for the payload of a string whose head has been read.
    AwaitingContent,
    /// A complete item is waiting to be taken.
    ItemReady,
    /// A decoding error occurred; only [`Decoder::reset`] leaves this state.
    Error,
}

pub struct Decoder {
    options: DecodeOptions,
    limits: Limits,
    buffer: BytesMut,
    builder: Box<dyn Build + Send>,
    value: Option<Value>,
    error: Option<Error>,
    awaiting_content: bool,
    stripped: bool,
    processing: bool,
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Result<Self, Error> {
        options.validate()?;
        let builder: Box<dyn Build + Send> = if options.flags.contains(Flags::EDN) {
            Box::new(edn::EdnBuilder::new(&options))
        } else {
            Box::new(ValueBuilder::new(&options))
        };
        Ok(Self {
            limits: Limits::new(options.max_depth, options.max_size),
            options,
            buffer: BytesMut::new(),
            builder,
            value: None,
            error: None,
            awaiting_content: false,
            stripped: false,
            processing: false,
        })
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    fn check_usable(&self) -> Result<(), Error> {
        if self.processing {
            return Err(Error::Internal("decoder called while processing"));
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, e: Error) -> Error {
        debug!("Decoder entering error state: {e}");
        self.error = Some(e.clone());
        e
    }

    /// Appends bytes to the input buffer.
    pub fn add(&mut self, data: &[u8]) -> Result<(), Error> {
        self.check_usable()?;
        if let Err(e) = self
            .limits
            .check_size((self.buffer.len() + data.len()) as u64)
        {
            return Err(self.fail(e));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Appends a slice of `data` to the input buffer.
    ///
    /// A negative `offset` counts back from the end of `data`. A `length` of `None`
    /// takes the rest of `data`, and a negative length ends that many bytes before the
    /// end of `data`. Out of range positions are clamped.
    pub fn add_range(
        &mut self,
        data: &[u8],
        offset: isize,
        length: Option<isize>,
    ) -> Result<(), Error> {
        let len = data.len() as isize;
        let start = if offset < 0 {
            (len + offset).max(0)
        } else {
            offset.min(len)
        };
        let end = match length {
            None => len,
            Some(n) if n < 0 => (len + n).max(start),
            Some(n) => start.saturating_add(n).min(len),
        };
        self.add(&data[start as usize..end as usize])
    }

    /// Decodes as much of the buffered input as possible.
    ///
    /// Returns `true` if a top-level item became ready during this call. While an item
    /// is ready and has not been taken, no further input is consumed.
    pub fn process(&mut self) -> Result<bool, Error> {
        self.check_usable()?;
        if self.value.is_some() {
            return Ok(false);
        }
        self.processing = true;
        let r = self.run();
        self.processing = false;
        r.map_err(|e| self.fail(e))
    }

    fn run(&mut self) -> Result<bool, Error> {
        loop {
            let (token, consumed) = match token::read(&self.buffer, &self.limits)? {
                Step::Ready(token, consumed) => (token, consumed),
                Step::NeedHeader => {
                    self.awaiting_content = false;
                    return Ok(false);
                }
                Step::NeedContent => {
                    self.awaiting_content = true;
                    return Ok(false);
                }
            };

            let item = if token == Token::Tag(tags::SELF_DESCRIBE)
                && !self.stripped
                && self.builder.is_empty()
                && !self.options.flags.contains(Flags::SELF_DESCRIBE)
            {
                self.stripped = true;
                None
            } else {
                self.builder.push(token)?
            };
            self.buffer.advance(consumed);

            if let Some(value) = item {
                self.stripped = false;
                self.awaiting_content = false;
                self.value = Some(value);
                return Ok(true);
            }
        }
    }

    /// The ready item, if any; with `clear` the item is taken so decoding can continue.
    pub fn get_value(&mut self, clear: bool) -> Option<Value> {
        if clear {
            self.value.take()
        } else {
            self.value.clone()
        }
    }

    pub fn take_value(&mut self) -> Option<Value> {
        self.get_value(true)
    }

    /// Returns to the idle state, dropping buffered input, partial items and any error.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.builder.reset();
        self.value = None;
        self.error = None;
        self.awaiting_content = false;
        self.stripped = false;
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// True when no item is ready but input has been buffered or an item is in progress.
    pub fn is_partial(&self) -> bool {
        self.value.is_none() && (!self.buffer.is_empty() || !self.builder.is_empty())
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// A copy of the buffered input not yet consumed.
    pub fn get_buffer(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn state(&self) -> DecoderState {
        if self.error.is_some() {
            DecoderState::Error
        } else if self.value.is_some() {
            DecoderState::ItemReady
        } else if self.buffer.is_empty() && self.builder.is_empty() {
            DecoderState::Idle
        } else if self.awaiting_content {
            DecoderState::AwaitingContent
        } else {
            DecoderState::AwaitingHeader
        }
    }
}

/// Decodes exactly one item from `data[options.offset..][..options.length]`.
pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<Value, Error> {
    let start = options.offset.min(data.len());
    let end = options
        .length
        .map_or(data.len(), |l| start.saturating_add(l).min(data.len()));

    let mut decoder = Decoder::new(*options)?;
    decoder.add(&data[start..end])?;
    if !decoder.process()? {
        return Err(Error::TruncatedData);
    }
    if !decoder.buffer.is_empty() {
        return Err(Error::ExtraneousData);
    }
    decoder
        .take_value()
        .ok_or(Error::Internal("ready item missing"))
}
