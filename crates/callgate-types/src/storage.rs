use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Key into the general storage region of the gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot(pub [u8; 32]);

impl Slot {
    /// Derive a slot key from a label, e.g. `"counter"`.
    pub fn named(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"callgate-slot-v1:");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Derive the slot of `key` inside the mapping rooted at `self`.
    pub fn entry(&self, key: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.0);
        hasher.update(key);
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot:{}", hex::encode(&self.0[..8]))
    }
}

/// 32-byte storage value. Unset slots read as [`Word::ZERO`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Word(pub [u8; 32]);

impl Word {
    pub const ZERO: Word = Word([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Big-endian integer, right-aligned.
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Low 128 bits of the word; `None` if any higher bit is set.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Address, right-aligned with zero padding.
    pub fn from_address(address: &Address) -> Self {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(address.as_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
