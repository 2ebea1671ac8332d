use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Selector: fixed-width identifier of one operation within a unit of logic.
///
/// A call payload always starts with the selector of the operation it
/// invokes; the argument encoding follows.
///
/// Derived selectors are not keccak-256 selectors. [`Selector::from_signature`]
/// hashes with BLAKE3, so `transferOwnership(address)` and every other
/// signature map to different bytes than an EVM ABI would produce. Callers
/// that must interoperate with EVM selectors pass them as raw hex instead
/// (`"0xf2fde38b".parse()`), which every entry point accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector([u8; 4]);

impl Selector {
    /// Width of a selector in bytes.
    pub const LEN: usize = 4;

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Derive the selector of an operation from its canonical signature,
    /// e.g. `"transfer(address,uint256)"`.
    ///
    /// The selector is the first four bytes of the BLAKE3 hash of the
    /// signature text, not of its keccak-256 hash. Whitespace is significant;
    /// callers pass the canonical form without spaces.
    pub fn from_signature(signature: &str) -> Self {
        let hash = blake3::hash(signature.as_bytes());
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&hash.as_bytes()[..4]);
        Self(bytes)
    }

    /// Extract the selector from the leading bytes of a call payload.
    ///
    /// Returns `None` when the payload is too short to carry one.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let head: [u8; 4] = payload.get(..Self::LEN)?.try_into().ok()?;
        Some(Self(head))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Build a payload: this selector followed by already-encoded arguments.
    pub fn with_args(&self, args: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(Self::LEN + args.len());
        payload.extend_from_slice(&self.0);
        payload.extend_from_slice(args);
        payload
    }
}

impl From<[u8; 4]> for Selector {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<u32> for Selector {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Selector {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        let array: [u8; 4] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_signature_is_deterministic() {
        let a = Selector::from_signature("transfer(address,uint256)");
        let b = Selector::from_signature("transfer(address,uint256)");
        let c = Selector::from_signature("approve(address,uint256)");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn from_signature_uses_blake3_not_keccak() {
        let signature = "transfer(address,uint256)";
        let derived = Selector::from_signature(signature);

        let hash = blake3::hash(signature.as_bytes());
        assert_eq!(derived.as_bytes()[..], hash.as_bytes()[..4]);
        // keccak-256 selector of the same signature
        assert_ne!(derived, Selector::from(0xa9059cbb_u32));

        let evm: Selector = "0xa9059cbb".parse().unwrap();
        assert_eq!(evm, Selector::from(0xa9059cbb_u32));
    }

    #[test]
    fn from_payload_reads_leading_bytes() {
        let payload = [0x12, 0x34, 0x56, 0x78, 0xaa, 0xbb];
        assert_eq!(
            Selector::from_payload(&payload),
            Some(Selector::new([0x12, 0x34, 0x56, 0x78]))
        );
        assert_eq!(Selector::from_payload(&payload[..3]), None);
        assert_eq!(Selector::from_payload(&[]), None);
    }

    #[test]
    fn u32_conversion_is_big_endian() {
        assert_eq!(
            Selector::from(0xdeadbeef_u32),
            Selector::new([0xde, 0xad, 0xbe, 0xef])
        );
    }

    #[test]
    fn parse_and_display() {
        let sel: Selector = "0x12345678".parse().unwrap();
        assert_eq!(sel, Selector::from(0x12345678_u32));
        assert_eq!(sel.to_string(), "0x12345678");
        assert!("0x123456".parse::<Selector>().is_err());
    }

    #[test]
    fn with_args_prefixes_selector() {
        let sel = Selector::from(0x01020304_u32);
        assert_eq!(sel.with_args(&[9, 9]), vec![1, 2, 3, 4, 9, 9]);
    }
}
