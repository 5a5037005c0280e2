/*!
Encoder and decoder configuration.

All option types implement [`Default`] with the documented defaults, and with the
`serde` feature they can be loaded from configuration files; missing fields take
their default value.
*/

use super::*;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const MAX_DEPTH_LIMIT: usize = 10000;
pub const DEFAULT_MAX_SIZE: usize = 16 * 1024 * 1024;

/// String reference mode when encoding.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StringRef {
    #[default]
    Off,
    /// Wrap the output in a string reference namespace and deduplicate strings.
    On,
    /// Only deduplicate inside caller supplied namespace tags.
    Explicit,
}

/// Shared reference mode when decoding.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SharedRef {
    #[default]
    Off,
    /// Shareable content is returned unwrapped.
    On,
    /// Shareable content is returned as [`Value::Shareable`].
    Shareable,
}

/// Line layout of diagnostic notation output.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Indent {
    /// Everything on a single line.
    #[default]
    None,
    /// One item per line, indented by the given number of spaces per level.
    Spaces(u8),
    /// One item per line, indented by one tab per level.
    Tab,
}

/// Formatting of diagnostic notation output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EdnOptions {
    pub indent: Indent,

    /// Put a space after `,` and `:`.
    pub space: bool,

    /// Bitmask of byte group sizes (1, 2, 4, 8, 16, 32) after which a space is written
    /// inside `h'..'` literals.
    pub byte_space: u8,

    /// Split byte string literals after this many bytes.
    pub byte_wrap: Option<u16>,
}

impl Default for EdnOptions {
    fn default() -> Self {
        Self {
            indent: Indent::None,
            space: true,
            byte_space: 0,
            byte_wrap: None,
        }
    }
}

impl EdnOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if let Indent::Spaces(n) = self.indent
            && !(1..=16).contains(&n)
        {
            return Err(Error::InvalidOptions("indent"));
        }
        if self.byte_space > 63 {
            return Err(Error::InvalidOptions("byte_space"));
        }
        if let Some(w) = self.byte_wrap
            && !(1..=1024).contains(&w)
        {
            return Err(Error::InvalidOptions("byte_wrap"));
        }
        Ok(())
    }
}

/// Options controlling [`encode`](crate::encode::encode).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncodeOptions {
    pub flags: Flags,
    pub max_depth: usize,
    pub string_ref: StringRef,
    pub shared_ref: bool,
    pub datetime: bool,
    pub bignum: bool,
    pub decimal: bool,
    pub uri: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            string_ref: StringRef::Off,
            shared_ref: false,
            datetime: true,
            bignum: true,
            decimal: true,
            uri: true,
        }
    }
}

impl EncodeOptions {
    pub fn with_flags(flags: Flags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.flags.check_encode()?;
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(Error::InvalidOptions("max_depth"));
        }
        Ok(())
    }

    /// Applies `params` on top of these options, as [`Value::Params`] does for its subtree.
    ///
    /// Setting one string form in `params.flags` drops the other form inherited from the
    /// outer options, so `TEXT` inside a `BYTE` encode switches rather than conflicts.
    pub fn with_params(&self, params: &EncodeParams) -> Result<Self, Error> {
        if params.flags_clear.contains(Flags::CDE) {
            return Err(Error::InvalidFlags(FlagsError::ClearCde));
        }

        let mut flags = self.flags & !params.flags_clear;
        for (a, b) in [
            (Flags::BYTE, Flags::TEXT),
            (Flags::KEY_BYTE, Flags::KEY_TEXT),
        ] {
            if params.flags.contains(a) {
                flags = flags & !b;
            }
            if params.flags.contains(b) {
                flags = flags & !a;
            }
        }

        let options = Self {
            flags: flags | params.flags,
            datetime: params.datetime.unwrap_or(self.datetime),
            bignum: params.bignum.unwrap_or(self.bignum),
            decimal: params.decimal.unwrap_or(self.decimal),
            uri: params.uri.unwrap_or(self.uri),
            ..*self
        };
        options.validate()?;
        Ok(options)
    }
}

/// Per-subtree overrides of the [`EncodeOptions`], carried by [`Value::Params`].
///
/// `flags` are set and `flags_clear` are removed from the inherited flags; the tag groups
/// are replaced where `Some`. Depth, reference modes and the self-describe prefix belong
/// to the whole encode and cannot be changed here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EncodeParams {
    pub flags: Flags,
    pub flags_clear: Flags,
    pub datetime: Option<bool>,
    pub bignum: Option<bool>,
    pub decimal: Option<bool>,
    pub uri: Option<bool>,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            flags: Flags::EMPTY,
            flags_clear: Flags::EMPTY,
            datetime: None,
            bignum: None,
            decimal: None,
            uri: None,
        }
    }
}

impl EncodeParams {
    pub fn with_flags(flags: Flags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }
}

/// Options controlling [`decode`](crate::decode::decode) and the [`Decoder`](crate::decode::Decoder).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecodeOptions {
    pub flags: Flags,
    pub max_depth: usize,

    /// Upper bound on buffered bytes, declared string lengths and container counts.
    pub max_size: usize,

    /// Start of the input slice used by one-shot decoding.
    pub offset: usize,

    /// Length of the input slice used by one-shot decoding, `None` for the rest.
    pub length: Option<usize>,

    pub string_ref: bool,
    pub shared_ref: SharedRef,
    pub datetime: bool,
    pub bignum: bool,
    pub decimal: bool,
    pub uri: bool,
    pub edn: EdnOptions,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_size: DEFAULT_MAX_SIZE,
            offset: 0,
            length: None,
            string_ref: true,
            shared_ref: SharedRef::Off,
            datetime: true,
            bignum: true,
            decimal: true,
            uri: true,
            edn: EdnOptions::default(),
        }
    }
}

impl DecodeOptions {
    pub fn with_flags(flags: Flags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.flags.check_decode()?;
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(Error::InvalidOptions("max_depth"));
        }
        if self.max_size == 0 {
            return Err(Error::InvalidOptions("max_size"));
        }
        if self.flags.contains(Flags::EDN) {
            self.edn.validate()?;
        }
        Ok(())
    }
}
