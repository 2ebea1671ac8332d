use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Address: identifier of a principal or of an addressable unit of logic.
///
/// Used for the gate itself, its owner, callers, value recipients and
/// delegate targets. The all-zero address is the null identifier and is never
/// a valid owner, target or recipient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Width of an address in bytes.
    pub const LEN: usize = 20;

    /// The null identifier.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic address derived from a label. Handy for fixtures and
    /// for naming delegates in configuration files.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"callgate-address-v1:");
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| ParseError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Short display form (first 4 bytes hex).
    pub fn short_id(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_null() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::derive("owner").is_zero());
    }

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(Address::derive("delegate"), Address::derive("delegate"));
        assert_ne!(Address::derive("delegate"), Address::derive("owner"));
    }

    #[test]
    fn parse_and_display() {
        let addr: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(addr.as_bytes()[19], 0xff);
        assert_eq!(
            addr.to_string(),
            "0x00000000000000000000000000000000000000ff"
        );

        // Prefix is optional
        let bare: Address = "00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(addr, bare);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let addr = Address::derive("owner");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let restored: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, addr);
    }
}
