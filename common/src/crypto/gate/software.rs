//! CPU gate device
//!
//! Gate formulas follow the usual torus encoding: `true` is `+1/8`, `false`
//! is `-1/8`. A binary gate is a linear combination of its two inputs plus a
//! constant, followed by a refresh that maps the sign of the phase back to a
//! fresh `±1/8` sample:
//!
//! ```text
//! AND:  refresh(c1 + c2 - 1/8)
//! OR:   refresh(c1 + c2 + 1/8)
//! XOR:  refresh(2 * (c1 + c2) + 1/4)
//! NOT:  -c                          (no refresh, exact)
//! ```
//!
//! The refresh is emulated under the bootstrap key rather than computed by
//! blind rotation, so the refresh key is a copy of the secret. It stays
//! inside this crate: callers only reach it through the gates of an
//! [`EvaluationContext`](super::EvaluationContext).
//!
//! Bits are refreshed one at a time; the `single_kernel_bootstrap` tuning
//! flag has no effect on this device.

use log::trace;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{BootstrapKey, Ciphertext, Gate, GateDevice, KeyPair, SecretKey};
use crate::{
    config::{GATE_MU, GATE_NOISE_BOUND, MIN_LWE_DIMENSION},
    crypto::GateError,
};

pub struct SoftwareDevice {
    rng: StdRng,
}

impl SoftwareDevice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn encode(bit: bool) -> u32 {
        if bit {
            GATE_MU
        } else {
            GATE_MU.wrapping_neg()
        }
    }

    fn decode(phase: u32) -> bool {
        (phase as i32) > 0
    }

    fn inner_product(mask: &[u32], key: &[u32]) -> u32 {
        mask.iter()
            .zip(key)
            .fold(0u32, |acc, (a, s)| acc.wrapping_add(a.wrapping_mul(*s)))
    }

    fn phase(key: &[u32], ciphertext: &Ciphertext) -> u32 {
        ciphertext
            .body()
            .wrapping_sub(Self::inner_product(ciphertext.mask(), key))
    }

    fn encrypt_bit(&mut self, key_id: u64, key: &[u32], bit: bool) -> Ciphertext {
        let mask: Box<[u32]> = (0..key.len()).map(|_| self.rng.gen::<u32>()).collect();
        let noise = self.rng.gen_range(-GATE_NOISE_BOUND..=GATE_NOISE_BOUND) as u32;
        let body = Self::inner_product(&mask, key)
            .wrapping_add(Self::encode(bit))
            .wrapping_add(noise);
        Ciphertext::new(mask, body, key_id)
    }

    // Map the sign of the phase to a fresh sample with minimal noise
    fn refresh(&mut self, key: &BootstrapKey, ciphertext: &Ciphertext) -> Ciphertext {
        let bit = Self::decode(Self::phase(key.refresh_key(), ciphertext));
        self.encrypt_bit(key.key_id(), key.refresh_key(), bit)
    }

    fn check(key: &BootstrapKey, ciphertext: &Ciphertext) -> Result<(), GateError> {
        if ciphertext.key_id() != key.key_id() {
            return Err(GateError::KeyMismatch);
        }
        if ciphertext.dimension() != key.dimension() {
            return Err(GateError::Evaluation(format!(
                "ciphertext dimension {} does not match key dimension {}",
                ciphertext.dimension(),
                key.dimension()
            )));
        }
        Ok(())
    }

    // scale * (left + right) + constant
    fn combine(left: &Ciphertext, right: &Ciphertext, scale: u32, constant: u32) -> Ciphertext {
        let mask: Box<[u32]> = left
            .mask()
            .iter()
            .zip(right.mask())
            .map(|(a, b)| a.wrapping_add(*b).wrapping_mul(scale))
            .collect();
        let body = left
            .body()
            .wrapping_add(right.body())
            .wrapping_mul(scale)
            .wrapping_add(constant);
        Ciphertext::new(mask, body, left.key_id())
    }

    fn linear_part(gate: Gate) -> (u32, u32) {
        match gate {
            Gate::And => (1, GATE_MU.wrapping_neg()),
            Gate::Or => (1, GATE_MU),
            Gate::Xor => (2, GATE_MU.wrapping_mul(2)),
        }
    }
}

impl GateDevice for SoftwareDevice {
    fn name(&self) -> &'static str {
        "software"
    }

    fn generate_keys(&mut self, lwe_dimension: usize) -> Result<KeyPair, GateError> {
        if lwe_dimension < MIN_LWE_DIMENSION {
            return Err(GateError::KeyGeneration(format!(
                "LWE dimension {} is below the minimum {}",
                lwe_dimension, MIN_LWE_DIMENSION
            )));
        }

        let key_id = self.rng.gen::<u64>();
        let key: Vec<u32> = (0..lwe_dimension)
            .map(|_| self.rng.gen_bool(0.5) as u32)
            .collect();

        trace!("generated software key pair {:016x}, dimension {}", key_id, lwe_dimension);
        Ok(KeyPair::new(
            SecretKey::new(key_id, key.clone()),
            BootstrapKey::new(key_id, key),
        ))
    }

    fn encrypt(&mut self, key: &SecretKey, bits: &[bool]) -> Result<Vec<Ciphertext>, GateError> {
        Ok(bits
            .iter()
            .map(|bit| self.encrypt_bit(key.key_id(), key.as_slice(), *bit))
            .collect())
    }

    fn decrypt(&mut self, key: &SecretKey, bits: &[Ciphertext]) -> Result<Vec<bool>, GateError> {
        bits.iter()
            .map(|c| {
                if c.key_id() != key.key_id() {
                    return Err(GateError::KeyMismatch);
                }
                Ok(Self::decode(Self::phase(key.as_slice(), c)))
            })
            .collect()
    }

    fn not(&mut self, key: &BootstrapKey, input: &[Ciphertext]) -> Result<Vec<Ciphertext>, GateError> {
        input
            .iter()
            .map(|c| {
                Self::check(key, c)?;
                let mask: Box<[u32]> = c.mask().iter().map(|a| a.wrapping_neg()).collect();
                Ok(Ciphertext::new(mask, c.body().wrapping_neg(), c.key_id()))
            })
            .collect()
    }

    fn gate(
        &mut self,
        gate: Gate,
        key: &BootstrapKey,
        left: &[Ciphertext],
        right: &[Ciphertext],
    ) -> Result<Vec<Ciphertext>, GateError> {
        if left.len() != right.len() {
            return Err(GateError::ShapeMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        let (scale, constant) = Self::linear_part(gate);
        let mut output = Vec::with_capacity(left.len());
        for (l, r) in left.iter().zip(right) {
            Self::check(key, l)?;
            Self::check(key, r)?;
            let combined = Self::combine(l, r, scale, constant);
            output.push(self.refresh(key, &combined));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LWE_DIMENSION;

    fn setup() -> (SoftwareDevice, KeyPair) {
        let mut device = SoftwareDevice::new(7);
        let keys = device.generate_keys(DEFAULT_LWE_DIMENSION).unwrap();
        (device, keys)
    }

    #[test]
    fn test_encrypt_decrypt() {
        let (mut device, keys) = setup();
        let bits = [true, false, false, true];
        let encrypted = device.encrypt(keys.secret_key(), &bits).unwrap();
        assert_eq!(device.decrypt(keys.secret_key(), &encrypted).unwrap(), bits);
    }

    #[test]
    fn test_truth_tables() {
        let (mut device, keys) = setup();
        let left = [false, false, true, true];
        let right = [false, true, false, true];
        let l = device.encrypt(keys.secret_key(), &left).unwrap();
        let r = device.encrypt(keys.secret_key(), &right).unwrap();
        let bk = keys.bootstrap_key().clone();

        let and = device.gate(Gate::And, &bk, &l, &r).unwrap();
        let or = device.gate(Gate::Or, &bk, &l, &r).unwrap();
        let xor = device.gate(Gate::Xor, &bk, &l, &r).unwrap();
        let not = device.not(&bk, &l).unwrap();

        assert_eq!(device.decrypt(keys.secret_key(), &and).unwrap(), [false, false, false, true]);
        assert_eq!(device.decrypt(keys.secret_key(), &or).unwrap(), [false, true, true, true]);
        assert_eq!(device.decrypt(keys.secret_key(), &xor).unwrap(), [false, true, true, false]);
        assert_eq!(device.decrypt(keys.secret_key(), &not).unwrap(), [true, true, false, false]);
    }

    #[test]
    fn test_gates_compose_after_not() {
        let (mut device, keys) = setup();
        let bk = keys.bootstrap_key().clone();
        let a = device.encrypt(keys.secret_key(), &[true, false]).unwrap();
        let not_a = device.not(&bk, &a).unwrap();
        // a XOR NOT a is always true, a AND NOT a always false
        let xor = device.gate(Gate::Xor, &bk, &a, &not_a).unwrap();
        let and = device.gate(Gate::And, &bk, &a, &not_a).unwrap();
        assert_eq!(device.decrypt(keys.secret_key(), &xor).unwrap(), [true, true]);
        assert_eq!(device.decrypt(keys.secret_key(), &and).unwrap(), [false, false]);
    }

    #[test]
    fn test_shape_mismatch() {
        let (mut device, keys) = setup();
        let l = device.encrypt(keys.secret_key(), &[true, false]).unwrap();
        let r = device.encrypt(keys.secret_key(), &[true]).unwrap();
        let err = device.gate(Gate::And, keys.bootstrap_key(), &l, &r).unwrap_err();
        assert_eq!(err, GateError::ShapeMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_foreign_ciphertext_rejected() {
        let (mut device, keys) = setup();
        let mut other = SoftwareDevice::new(8);
        let other_keys = other.generate_keys(DEFAULT_LWE_DIMENSION).unwrap();
        let foreign = other.encrypt(other_keys.secret_key(), &[true]).unwrap();

        assert_eq!(
            device.not(keys.bootstrap_key(), &foreign).unwrap_err(),
            GateError::KeyMismatch
        );
        assert_eq!(
            device.decrypt(keys.secret_key(), &foreign).unwrap_err(),
            GateError::KeyMismatch
        );
    }

    #[test]
    fn test_small_dimension_rejected() {
        let mut device = SoftwareDevice::new(1);
        assert!(matches!(
            device.generate_keys(MIN_LWE_DIMENSION - 1),
            Err(GateError::KeyGeneration(_))
        ));
    }
}
