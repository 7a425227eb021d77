use fhe_common::{crypto::GateError, U256};
use thiserror::Error;

use crate::stack::EntryKind;

/// Errors raised while executing a computation
///
/// Any of these marks the computation as erroring; the message executor
/// then reverts every state change made by the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("Stack underflow: needed {needed} items, {available} available")]
    StackUnderflow { needed: usize, available: usize },

    #[error("Stack type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: EntryKind, actual: EntryKind },

    #[error("Out of gas: needed {requested}, remaining {remaining} ({reason})")]
    OutOfGas {
        requested: u64,
        remaining: u64,
        reason: String,
    },

    #[error("Invalid opcode {0:#04x}")]
    InvalidOpcode(u8),

    #[error("Opcode requires an evaluation context but the computation has none")]
    MissingEvaluationContext,

    #[error("Homomorphic engine error: {0}")]
    Gate(#[from] GateError),

    #[error("State access failed: {0}")]
    State(String),
}

/// Guard failures of a message application
///
/// Raised before any state is mutated, so no revert is needed.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Stack depth limit reached: depth {depth} exceeds {limit}")]
    StackDepthLimit { depth: usize, limit: usize },

    #[error("Insufficient funds: {balance} < {value}")]
    InsufficientFunds { balance: U256, value: U256 },

    #[error(transparent)]
    State(#[from] anyhow::Error),
}
