mod hash;

pub mod error;
pub mod gate;

pub use error::GateError;
pub use hash::*;

pub use gate::{
    BootstrapKey, Ciphertext, DevicePreference, EncryptedWord, EngineConfig, EvaluationContext,
    Gate, GateDevice, GateEngine, KeyPair, PerformanceParameters, SoftwareDevice,
};
