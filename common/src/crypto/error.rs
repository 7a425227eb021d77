use thiserror::Error;

/// Errors raised by the homomorphic gate engine
///
/// Every variant is fatal for the computation frame that owns the
/// evaluation context: the caller treats it like any other execution
/// failure and reverts the state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No device could be acquired or the key material could not be generated
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Binary gate called with operands of different lengths
    #[error("Shape mismatch: left has {left} bits, right has {right} bits")]
    ShapeMismatch { left: usize, right: usize },

    /// Device or runtime failure while evaluating a gate
    #[error("Gate evaluation failed: {0}")]
    Evaluation(String),

    /// Ciphertext was produced under another session's keys
    #[error("Ciphertext does not belong to this evaluation session")]
    KeyMismatch,
}
