/*!
Behaviour flags shared by encoding and decoding.

Each flag has an encode meaning and a decode meaning; see the individual constants.
*/

use super::*;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// A set of codec flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Flags(u32);

impl Flags {
    pub const EMPTY: Self = Self(0);

    /// Encode: prefix the output with the self-describe tag.
    /// Decode: keep a leading self-describe tag instead of stripping it.
    pub const SELF_DESCRIBE: Self = Self(1 << 0);

    /// Encode: native strings are written as byte strings.
    /// Decode: byte strings are returned as native strings.
    pub const BYTE: Self = Self(1 << 1);

    /// Encode: native strings are written as text strings.
    /// Decode: text strings are returned as native strings.
    pub const TEXT: Self = Self(1 << 2);

    /// Encode: native string keys holding a decimal integer are written as integers.
    /// Decode: integer map keys are accepted.
    pub const INT_KEY: Self = Self(1 << 3);

    /// Encode: native string keys are written as byte strings.
    /// Decode: byte string map keys are accepted.
    pub const KEY_BYTE: Self = Self(1 << 4);

    /// Encode: native string keys are written as text strings.
    /// Decode: text string map keys are accepted.
    pub const KEY_TEXT: Self = Self(1 << 5);

    /// Decode: maps are returned as ordered pairs with arbitrary keys.
    pub const MAP_AS_ARRAY: Self = Self(1 << 6);

    /// Skip UTF-8 validation of text strings.
    pub const UNSAFE_TEXT: Self = Self(1 << 7);

    /// Encode: native floats are written as binary16.
    /// Decode: binary16 values are returned as native floats.
    pub const FLOAT16: Self = Self(1 << 8);

    /// Encode: native floats are written as binary32.
    /// Decode: binary32 values are returned as native floats.
    pub const FLOAT32: Self = Self(1 << 9);

    /// Decode: reject maps that contain the same key twice.
    pub const MAP_NO_DUP_KEY: Self = Self(1 << 11);

    /// Encode: core deterministic encoding (sorted map keys, shortest floats).
    pub const CDE: Self = Self(1 << 12);

    /// Decode: produce diagnostic notation text instead of a value tree.
    pub const EDN: Self = Self(1 << 13);

    const ALL: u32 = ((1 << 10) - 1) | (1 << 11) | (1 << 12) | (1 << 13);

    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Rejects bits with no assigned flag, which a deserialized value may carry.
    fn check_known(self) -> Result<(), Error> {
        match self.0 & !Self::ALL {
            0 => Ok(()),
            bits => Err(Error::InvalidFlags(FlagsError::Unknown(bits))),
        }
    }

    pub(crate) fn check_encode(self) -> Result<(), Error> {
        self.check_known()?;
        if self.contains(Self::BYTE | Self::TEXT) {
            Err(Error::InvalidFlags(FlagsError::BothString))
        } else if self.contains(Self::KEY_BYTE | Self::KEY_TEXT) {
            Err(Error::InvalidFlags(FlagsError::BothKeyString))
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_decode(self) -> Result<(), Error> {
        self.check_known()?;
        if self.contains(Self::FLOAT16 | Self::FLOAT32) {
            Err(Error::InvalidFlags(FlagsError::BothFloat))
        } else {
            Ok(())
        }
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::BYTE | Self::KEY_BYTE
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

impl BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for Flags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine() {
        let f = Flags::TEXT | Flags::KEY_TEXT;
        assert!(f.contains(Flags::TEXT));
        assert!(!f.contains(Flags::TEXT | Flags::BYTE));
        assert!(f.intersects(Flags::TEXT | Flags::BYTE));
        assert_eq!((f & !Flags::TEXT), Flags::KEY_TEXT);
        assert_eq!(Flags::from_bits(1 << 10), None);
        assert_eq!(Flags::from_bits(0b110), Some(Flags::BYTE | Flags::TEXT));
    }

    #[test]
    fn validation() {
        assert!(Flags::default().check_encode().is_ok());
        assert_eq!(
            (Flags::BYTE | Flags::TEXT).check_encode(),
            Err(Error::InvalidFlags(FlagsError::BothString))
        );
        assert_eq!(
            (Flags::KEY_BYTE | Flags::KEY_TEXT).check_encode(),
            Err(Error::InvalidFlags(FlagsError::BothKeyString))
        );
        assert_eq!(
            (Flags::FLOAT16 | Flags::FLOAT32).check_decode().map_err(|e| e.code()),
            Err(1)
        );
        // Both float widths on encode means "shortest lossless"
        assert!((Flags::FLOAT16 | Flags::FLOAT32).check_encode().is_ok());

        assert_eq!(
            Flags(1 << 10).check_encode(),
            Err(Error::InvalidFlags(FlagsError::Unknown(1 << 10)))
        );
        assert_eq!(
            Flags(Flags::BYTE.0 | 1 << 20).check_decode(),
            Err(Error::InvalidFlags(FlagsError::Unknown(1 << 20)))
        );
    }
}
