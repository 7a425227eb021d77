use std::sync::{Arc, Once};

use log::{debug, trace, warn};
use parking_lot::Mutex;
use primitive_types::U256;

use super::{
    BootstrapKey, Ciphertext, DevicePreference, EncryptedWord, EngineConfig, Gate, GateDevice,
    KeyPair, PerformanceParameters, SoftwareDevice,
};
use crate::{
    config::WORD_BITS,
    crypto::GateError,
    word::{from_bits, to_bits, BitVector256},
};

/// Builds the device backing a session from its seed
pub type DeviceFactory =
    Arc<dyn Fn(u64, &PerformanceParameters) -> Result<Box<dyn GateDevice>, GateError> + Send + Sync>;

static SOFTWARE_FALLBACK: Once = Once::new();

/// Entry point of the homomorphic evaluation
///
/// The engine itself holds no key material: every call to
/// [`GateEngine::create_session`] produces an independent
/// [`EvaluationContext`] with its own keys.
#[derive(Clone)]
pub struct GateEngine {
    config: EngineConfig,
    factory: Option<DeviceFactory>,
}

impl GateEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            factory: None,
        }
    }

    /// Use a custom device instead of the configured one
    pub fn with_device_factory(mut self, factory: DeviceFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn acquire_device(&self, seed: u64) -> Result<Box<dyn GateDevice>, GateError> {
        if let Some(factory) = &self.factory {
            return factory(seed, &self.config.performance);
        }

        let software = || Box::new(SoftwareDevice::new(seed)) as Box<dyn GateDevice>;

        match self.config.device {
            DevicePreference::Software => Ok(software()),
            DevicePreference::Accelerator => Err(GateError::KeyGeneration(
                "no compute device available".to_string(),
            )),
            DevicePreference::Auto => {
                SOFTWARE_FALLBACK.call_once(|| {
                    warn!("No accelerator available, gates will be evaluated by the software device");
                });
                Ok(software())
            }
        }
    }

    /// Create a new evaluation session
    ///
    /// Generates a fresh key pair from `seed` on a newly acquired device.
    pub fn create_session(&self, seed: u64) -> Result<EvaluationContext, GateError> {
        let mut device = self.acquire_device(seed)?;
        let keys = device.generate_keys(self.config.lwe_dimension)?;
        let device_name = device.name();

        debug!(
            "Created evaluation session {:016x} on {} device (dimension {}, {} bits per block)",
            keys.bootstrap_key().key_id(),
            device_name,
            self.config.lwe_dimension,
            self.config.performance.batch_size()
        );

        Ok(EvaluationContext {
            device: Mutex::new(device),
            device_name,
            performance: self.config.performance,
            keys,
        })
    }
}

impl Default for GateEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Keys, device and tuning of one computation frame
///
/// Not cloneable: the device is an exclusive resource. Every gate call
/// locks the device, so a context shared by reference between threads
/// still evaluates one batch at a time. Released when dropped.
///
/// Ciphertexts only come back as plaintext through [`decrypt_word`]; the
/// session keys cannot be read from outside the crate:
///
/// ```compile_fail
/// use fhe_common::crypto::GateEngine;
///
/// let ctx = GateEngine::default().create_session(1).unwrap();
/// let _ = ctx.bootstrap_key();
/// ```
///
/// [`decrypt_word`]: EvaluationContext::decrypt_word
pub struct EvaluationContext {
    device: Mutex<Box<dyn GateDevice>>,
    device_name: &'static str,
    performance: PerformanceParameters,
    keys: KeyPair,
}

impl EvaluationContext {
    pub fn device_name(&self) -> &'static str {
        self.device_name
    }

    pub fn performance(&self) -> &PerformanceParameters {
        &self.performance
    }

    pub(crate) fn bootstrap_key(&self) -> &BootstrapKey {
        self.keys.bootstrap_key()
    }

    pub fn key_id(&self) -> u64 {
        self.bootstrap_key().key_id()
    }

    /// Encrypt a plaintext word
    pub fn encrypt_word(&self, word: U256) -> Result<EncryptedWord, GateError> {
        let bits = to_bits(word);
        let ciphertexts = self.device.lock().encrypt(self.keys.secret_key(), &bits)?;
        EncryptedWord::try_from(ciphertexts)
    }

    /// Decrypt a word encrypted under this session
    pub fn decrypt_word(&self, word: &EncryptedWord) -> Result<U256, GateError> {
        let decrypted = self.device.lock().decrypt(self.keys.secret_key(), word.bits())?;
        let bits: BitVector256 = decrypted.try_into().map_err(|bits: Vec<bool>| {
            GateError::ShapeMismatch {
                left: bits.len(),
                right: WORD_BITS,
            }
        })?;
        Ok(from_bits(&bits))
    }

    /// Bit-wise NOT of raw ciphertexts
    pub fn not_bits(&self, input: &[Ciphertext]) -> Result<Vec<Ciphertext>, GateError> {
        trace!("NOT over {} bits", input.len());
        let mut output = Vec::with_capacity(input.len());
        for chunk in input.chunks(self.performance.batch_size()) {
            let mut device = self.device.lock();
            output.extend(device.not(self.keys.bootstrap_key(), chunk)?);
        }
        Ok(output)
    }

    /// Element-wise binary gate over raw ciphertexts
    pub fn gate_bits(
        &self,
        gate: Gate,
        left: &[Ciphertext],
        right: &[Ciphertext],
    ) -> Result<Vec<Ciphertext>, GateError> {
        if left.len() != right.len() {
            return Err(GateError::ShapeMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        trace!("{:?} over {} bits", gate, left.len());
        let batch = self.performance.batch_size();
        let mut output = Vec::with_capacity(left.len());
        for (l, r) in left.chunks(batch).zip(right.chunks(batch)) {
            let mut device = self.device.lock();
            output.extend(device.gate(gate, self.keys.bootstrap_key(), l, r)?);
        }
        Ok(output)
    }

    pub fn not(&self, input: &EncryptedWord) -> Result<EncryptedWord, GateError> {
        EncryptedWord::try_from(self.not_bits(input.bits())?)
    }

    pub fn and(&self, left: &EncryptedWord, right: &EncryptedWord) -> Result<EncryptedWord, GateError> {
        self.word_gate(Gate::And, left, right)
    }

    pub fn or(&self, left: &EncryptedWord, right: &EncryptedWord) -> Result<EncryptedWord, GateError> {
        self.word_gate(Gate::Or, left, right)
    }

    pub fn xor(&self, left: &EncryptedWord, right: &EncryptedWord) -> Result<EncryptedWord, GateError> {
        self.word_gate(Gate::Xor, left, right)
    }

    fn word_gate(
        &self,
        gate: Gate,
        left: &EncryptedWord,
        right: &EncryptedWord,
    ) -> Result<EncryptedWord, GateError> {
        EncryptedWord::try_from(self.gate_bits(gate, left.bits(), right.bits())?)
    }
}

impl Drop for EvaluationContext {
    fn drop(&mut self) {
        debug!(
            "Releasing evaluation session {:016x} on {} device",
            self.key_id(),
            self.device_name
        );
    }
}
