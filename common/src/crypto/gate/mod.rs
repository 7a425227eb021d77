//! Homomorphic gate engine
//!
//! Boolean gates (NOT, AND, OR, XOR) evaluated over encrypted bits without
//! ever materializing the plaintext values.
//!
//! # Architecture
//!
//! ```text
//! GateEngine (config + device factory)
//!     | create_session(seed)
//! EvaluationContext (one per computation frame)
//!     | owns
//! Mutex<Box<dyn GateDevice>> + PerformanceParameters + KeyPair
//! ```
//!
//! A [`GateDevice`] is the execution backend. When no accelerator is
//! available the [`SoftwareDevice`] implements the same contract on the CPU.

mod engine;
mod params;
mod software;

pub use engine::*;
pub use params::*;
pub use software::SoftwareDevice;

use std::sync::Arc;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::GateError;
use crate::config::WORD_BITS;

/// One encrypted bit
///
/// An LWE sample over the 32 bits torus: `body = <mask, key> + m + e`.
/// `key_id` ties the sample to the session whose keys produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    mask: Box<[u32]>,
    body: u32,
    key_id: u64,
}

impl Ciphertext {
    pub fn new(mask: Box<[u32]>, body: u32, key_id: u64) -> Self {
        Self { mask, body, key_id }
    }

    pub fn mask(&self) -> &[u32] {
        &self.mask
    }

    pub fn body(&self) -> u32 {
        self.body
    }

    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    pub fn dimension(&self) -> usize {
        self.mask.len()
    }
}

/// An encrypted machine word: exactly 256 ciphertexts, most significant bit first
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedWord(Box<[Ciphertext]>);

impl EncryptedWord {
    pub fn bits(&self) -> &[Ciphertext] {
        &self.0
    }

    pub fn into_bits(self) -> Vec<Ciphertext> {
        self.0.into_vec()
    }

    pub fn key_id(&self) -> u64 {
        self.0[0].key_id
    }
}

impl TryFrom<Vec<Ciphertext>> for EncryptedWord {
    type Error = GateError;

    fn try_from(bits: Vec<Ciphertext>) -> Result<Self, Self::Error> {
        if bits.len() != WORD_BITS {
            return Err(GateError::ShapeMismatch {
                left: bits.len(),
                right: WORD_BITS,
            });
        }
        Ok(Self(bits.into_boxed_slice()))
    }
}

/// LWE secret of a session
///
/// Only the owning [`EvaluationContext`] hands it to its device, nothing
/// outside the engine can reach it. Wiped when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key_id: u64,
    key: Vec<u32>,
}

impl SecretKey {
    pub fn new(key_id: u64, key: Vec<u32>) -> Self {
        Self { key_id, key }
    }

    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.key
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct RefreshKey(Vec<u32>);

/// Key material needed to evaluate gates
///
/// Cheap to clone, shared by every gate call of a session. A device may
/// derive its refresh key from the secret, so the raw key never leaves this
/// crate; outside code only sees the session id and dimension.
///
/// ```compile_fail
/// fn leak(key: &fhe_common::crypto::BootstrapKey) -> &[u32] {
///     key.refresh_key()
/// }
/// ```
#[derive(Clone)]
pub struct BootstrapKey {
    key_id: u64,
    dimension: usize,
    refresh: Arc<RefreshKey>,
}

impl BootstrapKey {
    pub fn new(key_id: u64, refresh: Vec<u32>) -> Self {
        Self {
            key_id,
            dimension: refresh.len(),
            refresh: Arc::new(RefreshKey(refresh)),
        }
    }

    pub(crate) fn refresh_key(&self) -> &[u32] {
        &self.refresh.0
    }

    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl std::fmt::Debug for BootstrapKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapKey")
            .field("key_id", &self.key_id)
            .field("dimension", &self.dimension)
            .finish()
    }
}

/// Keys of one session, produced by [`GateDevice::generate_keys`]
///
/// Only the engine reads them back:
///
/// ```compile_fail
/// fn leak(keys: &fhe_common::crypto::KeyPair) -> &fhe_common::crypto::BootstrapKey {
///     keys.bootstrap_key()
/// }
/// ```
pub struct KeyPair {
    secret_key: SecretKey,
    bootstrap_key: BootstrapKey,
}

impl KeyPair {
    pub fn new(secret_key: SecretKey, bootstrap_key: BootstrapKey) -> Self {
        Self {
            secret_key,
            bootstrap_key,
        }
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub(crate) fn bootstrap_key(&self) -> &BootstrapKey {
        &self.bootstrap_key
    }
}

/// Binary gates supported by every device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gate {
    And,
    Or,
    Xor,
}

/// Backend executing the gates
///
/// Devices are not re-entrant: the [`EvaluationContext`] serializes every
/// call behind a mutex, so implementations can keep mutable state
/// (randomness, device queues) without further synchronization.
pub trait GateDevice: Send {
    /// Human-readable name used for logging
    fn name(&self) -> &'static str;

    /// Generate a fresh key pair for a session
    fn generate_keys(&mut self, lwe_dimension: usize) -> Result<KeyPair, GateError>;

    /// Encrypt plaintext bits under the session secret key
    fn encrypt(&mut self, key: &SecretKey, bits: &[bool]) -> Result<Vec<Ciphertext>, GateError>;

    /// Decrypt ciphertexts under the session secret key
    fn decrypt(&mut self, key: &SecretKey, bits: &[Ciphertext]) -> Result<Vec<bool>, GateError>;

    /// Bit-wise NOT
    fn not(&mut self, key: &BootstrapKey, input: &[Ciphertext]) -> Result<Vec<Ciphertext>, GateError>;

    /// Element-wise binary gate; both operands have the same length
    fn gate(
        &mut self,
        gate: Gate,
        key: &BootstrapKey,
        left: &[Ciphertext],
        right: &[Ciphertext],
    ) -> Result<Vec<Ciphertext>, GateError>;
}
