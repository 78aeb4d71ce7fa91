//! Canonical, fixed-width value hashing.
//!
//! Every [`crate::Value`] variant has a canonical byte serialization
//! (see [`crate::Value::canonical_bytes`]); this module turns that byte
//! form into a stable 128-bit digest. Two values are identity-equal iff
//! their hashes match.
//!
//! 128 bits is produced from two independently-keyed SipHash-1-3 passes
//! over the canonical bytes rather than reaching for a dedicated 128-bit
//! hash crate, since `siphasher` is already the hashing dependency the
//! rest of the workspace carries.

use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// First 128-bit SipHash key (arbitrary, fixed for the process lifetime of
/// every store — two stores hashing the same value always agree).
const KEY0: (u64, u64) = (0x9e37_79b9_7f4a_7c15, 0xb492_9664_0fc5_3a37);
/// Second key, distinct from [`KEY0`], used for the high half of the digest.
const KEY1: (u64, u64) = (0xf58f_1ce2_2f5a_6c1b, 0x5851_f42d_4c95_7f2d);

/// Fixed-width digest of a canonical value form.
///
/// Implements `Ord` so node/quad tables that want a sorted key space (the
/// backend adapter contract sorts node updates by hash,) can use
/// this type directly as the key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueHash(pub [u8; 16]);

impl ValueHash {
    /// Hash canonical bytes into a 128-bit digest.
    pub fn of(bytes: &[u8]) -> Self {
        let mut lo = SipHasher13::new_with_keys(KEY0.0, KEY0.1);
        lo.write(bytes);
        let mut hi = SipHasher13::new_with_keys(KEY1.0, KEY1.1);
        hi.write(bytes);

        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&lo.finish().to_be_bytes());
        out[8..].copy_from_slice(&hi.finish().to_be_bytes());
        ValueHash(out)
    }

    /// Render as lowercase hex, used for debug output and index key display.
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Raw bytes of the digest.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Debug for ValueHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueHash({})", self.to_hex())
    }
}

impl std::fmt::Display for ValueHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ValueHash::of(b"hello");
        let b = ValueHash::of(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_inputs() {
        let a = ValueHash::of(b"hello");
        let b = ValueHash::of(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_round_trips_length() {
        let h = ValueHash::of(b"x");
        assert_eq!(h.to_hex().len(), 32);
    }
}
