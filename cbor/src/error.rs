/*!
Error taxonomy shared by the encoder and the decoder.

Every failure carries a stable numeric code (see [`Error::code`]) so callers can
match on the class of failure without depending on the message text.
*/

use thiserror::Error;

/// The error type returned by every fallible codec operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Indicates that the supplied flags are contradictory or incomplete.
    #[error("Invalid flags: {0}")]
    InvalidFlags(FlagsError),

    /// Indicates that an option value is out of its permitted range.
    #[error("Invalid value for option '{0}'")]
    InvalidOptions(&'static str),

    /// Indicates that nesting exceeded the configured maximum depth.
    #[error("Maximum nesting depth exceeded")]
    Depth,

    /// Indicates that a shared reference points at one of its own ancestors.
    #[error("Recursive reference detected")]
    Recursion,

    /// Indicates that the input breaks the CBOR grammar.
    #[error("Syntax error: {0}")]
    Syntax(SyntaxError),

    /// Indicates that a text string is not valid UTF-8.
    #[error("Invalid UTF-8 sequence in text string")]
    Utf8,

    /// Indicates a value that has no CBOR representation.
    #[error("Unsupported type")]
    UnsupportedType,

    /// Indicates a value of a supported type with content that cannot be represented.
    #[error("Unsupported value")]
    UnsupportedValue,

    /// Indicates a length or element count beyond the configured limits.
    #[error("Unsupported size")]
    UnsupportedSize,

    /// Indicates a map key of a type that is not accepted.
    #[error("Unsupported map key type")]
    UnsupportedKeyType,

    /// Indicates a map key of an accepted type with an unusable value.
    #[error("Unsupported map key value")]
    UnsupportedKeyValue,

    /// Indicates a map key that is too large.
    #[error("Unsupported map key size")]
    UnsupportedKeySize,

    /// Indicates that a map contains the same key twice.
    #[error("Duplicate map key")]
    DuplicateKey,

    /// Indicates that the input ended before the item was complete.
    #[error("Not enough data for encoded value")]
    TruncatedData,

    /// Indicates bytes that cannot be read as any CBOR token.
    #[error("Malformed data")]
    MalformedData,

    /// Indicates bytes remaining after a complete item.
    #[error("Additional data after end of item")]
    ExtraneousData,

    /// Indicates a tag used where its grammar does not allow it.
    #[error("Tag {0} is not permitted here")]
    TagSyntax(u64),

    /// Indicates a tag whose content has the wrong type.
    #[error("Tag {0} has content of an incorrect type")]
    TagType(u64),

    /// Indicates a tag whose content has an invalid value.
    #[error("Tag {0} has an invalid content value")]
    TagValue(u64),

    /// Indicates a broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

/// Detail for [`Error::Syntax`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("break with no open indefinite-length item")]
    BreakUnderflow,

    #[error("break inside a definite-length item")]
    BreakUnexpected,

    #[error("chunk of another string type inside an indefinite-length string")]
    InconsistentStringType,

    #[error("indefinite-length chunk inside an indefinite-length string")]
    NestedIndefiniteString,
}

/// Detail for [`Error::InvalidFlags`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagsError {
    #[error("both BYTE and TEXT are set")]
    BothString,

    #[error("both KEY_BYTE and KEY_TEXT are set")]
    BothKeyString,

    #[error("neither BYTE nor TEXT is set")]
    NoString,

    #[error("neither KEY_BYTE nor KEY_TEXT is set")]
    NoKeyString,

    #[error("both FLOAT16 and FLOAT32 are set")]
    BothFloat,

    #[error("unknown flag bits {0:#x}")]
    Unknown(u32),

    #[error("CDE cannot be cleared inside an encode")]
    ClearCde,
}

impl Error {
    /// The stable numeric error code.
    pub fn code(&self) -> u8 {
        match self {
            Self::InvalidFlags(_) => 1,
            Self::InvalidOptions(_) => 2,
            Self::Depth => 3,
            Self::Recursion => 4,
            Self::Syntax(_) => 5,
            Self::Utf8 => 6,
            Self::UnsupportedType => 17,
            Self::UnsupportedValue => 18,
            Self::UnsupportedSize => 19,
            Self::UnsupportedKeyType => 25,
            Self::UnsupportedKeyValue => 26,
            Self::UnsupportedKeySize => 27,
            Self::DuplicateKey => 28,
            Self::TruncatedData => 33,
            Self::MalformedData => 34,
            Self::ExtraneousData => 35,
            Self::TagSyntax(_) => 41,
            Self::TagType(_) => 42,
            Self::TagValue(_) => 43,
            Self::Internal(_) => 241,
        }
    }

    /// The stable name of the error class.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidFlags(_) => "invalid-flags",
            Self::InvalidOptions(_) => "invalid-options",
            Self::Depth => "depth",
            Self::Recursion => "recursion",
            Self::Syntax(_) => "syntax",
            Self::Utf8 => "utf8",
            Self::UnsupportedType => "unsupported-type",
            Self::UnsupportedValue => "unsupported-value",
            Self::UnsupportedSize => "unsupported-size",
            Self::UnsupportedKeyType => "unsupported-key-type",
            Self::UnsupportedKeyValue => "unsupported-key-value",
            Self::UnsupportedKeySize => "unsupported-key-size",
            Self::DuplicateKey => "duplicate-key",
            Self::TruncatedData => "truncated-data",
            Self::MalformedData => "malformed-data",
            Self::ExtraneousData => "extraneous-data",
            Self::TagSyntax(_) => "tag-syntax",
            Self::TagType(_) => "tag-type",
            Self::TagValue(_) => "tag-value",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::InvalidFlags(FlagsError::NoString).code(), 1);
        assert_eq!(Error::Depth.code(), 3);
        assert_eq!(Error::Syntax(SyntaxError::BreakUnderflow).code(), 5);
        assert_eq!(Error::UnsupportedKeyType.code(), 25);
        assert_eq!(Error::DuplicateKey.code(), 28);
        assert_eq!(Error::TruncatedData.code(), 33);
        assert_eq!(Error::TagValue(25).code(), 43);
        assert_eq!(Error::Internal("x").code(), 241);
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::Syntax(SyntaxError::BreakUnderflow).to_string(),
            "Syntax error: break with no open indefinite-length item"
        );
        assert_eq!(Error::TagType(2).to_string(), "Tag 2 has content of an incorrect type");
        assert_eq!(Error::ExtraneousData.name(), "extraneous-data");
    }
}
