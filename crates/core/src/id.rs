//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a ledger instance (names its event stream).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(Uuid);

impl LedgerId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LedgerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for LedgerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for LedgerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Opaque fixed-width identity of a ledger participant.
///
/// Text form is `0x` followed by 40 lowercase hex digits.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; Address::LEN]);

impl Address {
    pub const LEN: usize = 20;

    /// The all-zero address, used by default (unregistered) user records.
    pub const ZERO: Address = Address([0u8; Address::LEN]);

    pub const fn from_bytes(bytes: [u8; Address::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Address::LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; Address::LEN]
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; Address::LEN]> for Address {
    fn from(value: [u8; Address::LEN]) -> Self {
        Self(value)
    }
}

impl FromStr for Address {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != Address::LEN * 2 {
            return Err(DomainError::invalid_address(format!(
                "expected {} hex digits, found {}",
                Address::LEN * 2,
                digits.len()
            )));
        }

        let mut bytes = [0u8; Address::LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| DomainError::invalid_address(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! impl_index_newtype {
    ($t:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Copy,
            Clone,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(pub u64);

        impl $t {
            pub fn value(self) -> u64 {
                self.0
            }

            /// Position as a slice index, or `None` if it does not fit in
            /// `usize` on this target.
            pub fn index(self) -> Option<usize> {
                usize::try_from(self.0).ok()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $t {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

impl_index_newtype!(
    PostId,
    "Position of a post in the ledger's post sequence (creation order, from 0)."
);
impl_index_newtype!(
    CommentId,
    "Position of a comment within its post's comment sequence (from 0)."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_text() {
        let addr = Address::from_bytes([0xab; Address::LEN]);
        let text = addr.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_parse_accepts_missing_prefix_and_uppercase() {
        let parsed: Address = "00000000000000000000000000000000000000FF".parse().unwrap();
        let mut bytes = [0u8; Address::LEN];
        bytes[19] = 0xff;
        assert_eq!(parsed, Address::from_bytes(bytes));
    }

    #[test]
    fn address_parse_rejects_wrong_length_and_bad_digits() {
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(DomainError::InvalidAddress(_))
        ));
        let bad = format!("0x{}", "zz".repeat(20));
        assert!(matches!(
            bad.parse::<Address>(),
            Err(DomainError::InvalidAddress(_))
        ));
    }

    #[test]
    fn positional_ids_convert_to_indices() {
        assert_eq!(PostId(7).index(), Some(7));
        assert_eq!(CommentId(0).index(), Some(0));
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn ids_beyond_usize_have_no_index() {
        assert_eq!(PostId(1 << 32).index(), None);
        assert_eq!(CommentId(u64::MAX).index(), None);
    }

    #[test]
    fn default_address_is_zero() {
        assert!(Address::default().is_zero());
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let addr = Address::from_bytes([1; Address::LEN]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
