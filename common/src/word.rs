//! Word codec
//!
//! Conversions between the machine word (an unsigned 256 bits integer), its
//! two's complement signed view and the fixed length bit vector that is fed
//! to the gate engine.
//!
//! All functions here are total: every word has exactly one bit vector and
//! exactly one signed view, and the conversions are mutually inverse.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use primitive_types::U256;

use crate::config::{WORD_BITS, WORD_BYTES};

/// Bits of a word, index 0 is the most significant bit
pub type BitVector256 = [bool; WORD_BITS];

/// Decompose a word into its bits, most significant bit first
pub fn to_bits(word: U256) -> BitVector256 {
    let mut bits = [false; WORD_BITS];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = word.bit(WORD_BITS - 1 - i);
    }
    bits
}

/// Rebuild a word from its bits, most significant bit first
pub fn from_bits(bits: &BitVector256) -> U256 {
    bits.iter().fold(U256::zero(), |acc, bit| {
        (acc << 1u32) | U256::from(*bit as u8)
    })
}

/// Big endian encoding of a word
pub fn to_be_bytes(word: U256) -> [u8; WORD_BYTES] {
    let mut bytes = [0u8; WORD_BYTES];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = word.byte(WORD_BYTES - 1 - i);
    }
    bytes
}

/// Decode a big endian word
///
/// Inputs longer than a word keep their trailing 32 bytes, like a word
/// reduced modulo 2^256.
pub fn from_be_bytes(bytes: &[u8]) -> U256 {
    let start = bytes.len().saturating_sub(WORD_BYTES);
    U256::from_big_endian(&bytes[start..])
}

// Two's complement negation modulo 2^256
fn negate(word: U256) -> U256 {
    (!word).overflowing_add(U256::one()).0
}

/// Two's complement view of a word
///
/// Stored as sign and magnitude so it can represent the full
/// `[-2^255, 2^255)` range. Zero is never negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignedWord {
    negative: bool,
    magnitude: U256,
}

impl SignedWord {
    pub fn zero() -> Self {
        Self {
            negative: false,
            magnitude: U256::zero(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> U256 {
        self.magnitude
    }
}

impl Ord for SignedWord {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl PartialOrd for SignedWord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SignedWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

/// Interpret a word as a two's complement signed integer
pub fn to_signed(word: U256) -> SignedWord {
    if word.bit(WORD_BITS - 1) {
        SignedWord {
            negative: true,
            magnitude: negate(word),
        }
    } else {
        SignedWord {
            negative: false,
            magnitude: word,
        }
    }
}

/// Encode a signed integer back into its two's complement word
pub fn to_unsigned(value: SignedWord) -> U256 {
    if value.negative {
        negate(value.magnitude)
    } else {
        value.magnitude
    }
}
