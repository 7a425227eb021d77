//! Opcode layer and message executor of the FHE virtual machine
//!
//! Plaintext 256-bit words and encrypted words share one typed stack. The
//! homomorphic fork evaluates `NOT` and the encrypted opcode family through
//! a gate engine session owned by each computation frame.

pub mod computation;
pub mod error;
pub mod executor;
pub mod gas;
pub mod message;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod state;

pub use computation::Computation;
pub use error::{MessageError, VmError};
pub use executor::{Fork, Interpreter, MessageExecutor};
pub use message::{Message, TransactionContext};
pub use opcodes::{Opcode, OpcodeTable};
pub use precompiles::PrecompileRegistry;
pub use stack::{EntryKind, Stack, StackEntry};
pub use state::{AccountState, BalanceDelta, MemoryState, Snapshot};
