//! MAC address value objects.
//!
//! [`MacAddr`] is the identity of every tracked device. Scanner exports,
//! vendor databases and side-files all spell addresses slightly differently
//! (colons or dashes, upper or lower case); parsing normalizes them so that
//! two spellings of one address compare equal.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MergeError;

// ---------------------------------------------------------------------------
// MacAddr -- Value Object
// ---------------------------------------------------------------------------

/// A 6-byte IEEE 802 MAC address.
///
/// Displayed in the canonical `AA:BB:CC:DD:EE:FF` form (uppercase, colon
/// separated, always 17 characters).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Length of the canonical text form.
    pub const TEXT_LEN: usize = 17;

    /// Parse a MAC address written as six hex octets separated by `:` or `-`.
    ///
    /// Surrounding whitespace is ignored. Case does not matter.
    pub fn parse(s: &str) -> Result<Self, MergeError> {
        let trimmed = s.trim();
        let fail = || MergeError::MacParseFailed {
            input: s.to_owned(),
        };
        if trimmed.len() != Self::TEXT_LEN {
            return Err(fail());
        }

        let mut bytes = [0u8; 6];
        for (i, part) in trimmed.split([':', '-']).enumerate() {
            if i >= 6 || part.len() != 2 {
                return Err(fail());
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| fail())?;
        }
        Ok(Self(bytes))
    }

    /// Return the raw 6-byte MAC address.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// The organisationally unique identifier (first three octets).
    pub fn oui(&self) -> Oui {
        Oui([self.0[0], self.0[1], self.0[2]])
    }

    /// Bucket number of the historical fixed-offset hash.
    ///
    /// The old index sampled the four hex digits of the last two octets
    /// (character offsets 12, 13, 15 and 16 of the canonical form), giving a
    /// 65536-bucket space.
    pub fn legacy_bucket(&self) -> u16 {
        u16::from_be_bytes([self.0[4], self.0[5]])
    }
}

impl FromStr for MacAddr {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

// ---------------------------------------------------------------------------
// Oui -- Value Object
// ---------------------------------------------------------------------------

/// The first three octets of a MAC address, used to resolve the vendor.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Oui(pub [u8; 3]);

impl Oui {
    /// Parse `AA:BB:CC` or `AA-BB-CC`.
    pub fn parse(s: &str) -> Result<Self, MergeError> {
        let trimmed = s.trim();
        let fail = || MergeError::MacParseFailed {
            input: s.to_owned(),
        };
        if trimmed.len() != 8 {
            return Err(fail());
        }

        let mut bytes = [0u8; 3];
        for (i, part) in trimmed.split([':', '-']).enumerate() {
            if i >= 3 || part.len() != 2 {
                return Err(fail());
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| fail())?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Oui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oui({self})")
    }
}

impl fmt::Display for Oui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}")
    }
}
