//! Message application
//!
//! [`MessageExecutor`] turns a [`Message`] into a finished [`Computation`]:
//! guards, value transfer, execution through the precompiles or the
//! embedder's [`Interpreter`], then commit or revert of every state change
//! made by the frame.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use fhe_common::{
    config::{GAS_CODEDEPOSIT, STACK_DEPTH_LIMIT},
    crypto::{keccak256, GateEngine},
};
use log::{debug, trace};
use strum::Display;

use crate::{
    message::{Message, TransactionContext},
    opcodes::{OpcodeTable, FHE_OPCODES, STANDARD_OPCODES},
    precompiles::PrecompileRegistry,
    state::{AccountState, BalanceDelta},
    Computation, MessageError, VmError,
};

/// Instruction set selected for a chain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Fork {
    /// Plaintext semantics, no gate engine
    Standard,
    /// Gate engine session per frame, `NOT` and the encrypted family on ciphertexts
    #[default]
    Homomorphic,
}

impl Fork {
    pub fn opcodes(&self) -> Arc<OpcodeTable> {
        match self {
            Fork::Standard => STANDARD_OPCODES.clone(),
            Fork::Homomorphic => FHE_OPCODES.clone(),
        }
    }

    pub fn is_homomorphic(&self) -> bool {
        matches!(self, Fork::Homomorphic)
    }
}

/// Execution loop run on the code of a message
///
/// Supplied by the embedder. Errors returned here mark the computation as
/// failed and revert the frame.
pub trait Interpreter: Send + Sync {
    fn execute(
        &self,
        computation: &mut Computation,
        state: &mut dyn AccountState,
    ) -> Result<(), VmError>;
}

pub struct MessageExecutor {
    fork: Fork,
    opcodes: Arc<OpcodeTable>,
    engine: GateEngine,
    interpreter: Arc<dyn Interpreter>,
    precompiles: PrecompileRegistry,
    next_seed: AtomicU64,
}

impl MessageExecutor {
    /// Executor for `fork` with the built in precompiles and a random seed
    pub fn new(fork: Fork, engine: GateEngine, interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            fork,
            opcodes: fork.opcodes(),
            engine,
            interpreter,
            precompiles: PrecompileRegistry::with_builtins(),
            next_seed: AtomicU64::new(rand::random()),
        }
    }

    /// Replace the opcode table of the fork
    pub fn with_opcodes(mut self, opcodes: Arc<OpcodeTable>) -> Self {
        self.opcodes = opcodes;
        self
    }

    pub fn with_precompiles(mut self, precompiles: PrecompileRegistry) -> Self {
        self.precompiles = precompiles;
        self
    }

    /// Derive the key generation seeds of the sessions from `seed`
    pub fn with_seed(self, seed: u64) -> Self {
        self.next_seed.store(seed, Ordering::Relaxed);
        self
    }

    pub fn fork(&self) -> Fork {
        self.fork
    }

    pub fn precompiles(&self) -> &PrecompileRegistry {
        &self.precompiles
    }

    /// Apply a message call
    ///
    /// Depth and balance guards fail before anything is mutated and are
    /// returned as errors. Everything else, including gate engine failures,
    /// is recorded on the returned computation, in which case every state
    /// change of the frame has been reverted.
    pub fn apply_message(
        &self,
        state: &mut dyn AccountState,
        message: Message,
        transaction_context: &TransactionContext,
    ) -> Result<Computation, MessageError> {
        let snapshot = state.snapshot();

        if message.depth > STACK_DEPTH_LIMIT {
            state.revert(snapshot)?;
            return Err(MessageError::StackDepthLimit {
                depth: message.depth,
                limit: STACK_DEPTH_LIMIT,
            });
        }

        if let Err(e) = transfer_and_touch(state, &message) {
            state.revert(snapshot)?;
            return Err(e);
        }

        let mut computation = self.execute(state, message, transaction_context);

        if computation.is_error() {
            state.revert(snapshot)?;
        } else {
            state.commit(snapshot)?;
        }

        computation.release_evaluation_context();
        Ok(computation)
    }

    /// Apply a contract creation
    ///
    /// On success the output is deployed as code at the storage address,
    /// charged per byte. When the deposit cannot be paid the creation still
    /// succeeds with empty output and no code.
    pub fn apply_create_message(
        &self,
        state: &mut dyn AccountState,
        message: Message,
        transaction_context: &TransactionContext,
    ) -> Result<Computation, MessageError> {
        let mut computation = self.apply_message(state, message, transaction_context)?;
        if computation.is_error() || computation.output().is_empty() {
            return Ok(computation);
        }

        let contract_code = computation.output().to_vec();
        let deposit = (contract_code.len() as u64).saturating_mul(GAS_CODEDEPOSIT);
        match computation.consume_gas(deposit, "Write contract code for CREATE") {
            Ok(()) => {
                let address = computation.message().storage_address;
                trace!(
                    "SETTING CODE: {} -> length: {} | hash: {}",
                    address,
                    contract_code.len(),
                    keccak256(&contract_code)
                );
                state.set_code(&address, contract_code)?;
            }
            Err(e) => {
                debug!("Contract code not deposited: {}", e);
                computation.set_output(Vec::new());
            }
        }

        Ok(computation)
    }

    fn execute(
        &self,
        state: &mut dyn AccountState,
        message: Message,
        transaction_context: &TransactionContext,
    ) -> Computation {
        let evaluation = if self.fork.is_homomorphic() {
            let seed = self.next_seed.fetch_add(1, Ordering::Relaxed);
            self.engine.create_session(seed).map(Some)
        } else {
            Ok(None)
        };

        match evaluation {
            Ok(evaluation) => {
                let mut computation = Computation::new(
                    message,
                    transaction_context.clone(),
                    self.opcodes.clone(),
                    evaluation,
                );
                if let Err(e) = self.run(&mut computation, state) {
                    computation.set_error(e);
                }
                computation
            }
            Err(e) => {
                let mut computation = Computation::new(
                    message,
                    transaction_context.clone(),
                    self.opcodes.clone(),
                    None,
                );
                computation.set_error(e.into());
                computation
            }
        }
    }

    fn run(
        &self,
        computation: &mut Computation,
        state: &mut dyn AccountState,
    ) -> Result<(), VmError> {
        match self.precompiles.get(&computation.message().code_address) {
            Some(precompile) => precompile(computation),
            None => self.interpreter.execute(computation, state),
        }
    }
}

fn transfer_and_touch(state: &mut dyn AccountState, message: &Message) -> Result<(), MessageError> {
    if message.should_transfer_value && !message.value.is_zero() {
        let balance = state.get_balance(&message.sender)?;
        if balance < message.value {
            return Err(MessageError::InsufficientFunds {
                balance,
                value: message.value,
            });
        }

        state.delta_balance(&message.sender, BalanceDelta::Debit(message.value))?;
        state.delta_balance(&message.storage_address, BalanceDelta::Credit(message.value))?;

        trace!(
            "TRANSFERRED: {} from {} -> {}",
            message.value,
            message.sender,
            message.storage_address
        );
    }

    state.touch_account(&message.storage_address)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryState;
    use fhe_common::{
        crypto::{DevicePreference, EngineConfig},
        Address, U256,
    };

    struct Noop;

    impl Interpreter for Noop {
        fn execute(&self, _: &mut Computation, _: &mut dyn AccountState) -> Result<(), VmError> {
            Ok(())
        }
    }

    fn executor(fork: Fork) -> MessageExecutor {
        let engine = GateEngine::new(EngineConfig {
            device: DevicePreference::Software,
            lwe_dimension: 32,
            ..EngineConfig::default()
        });
        MessageExecutor::new(fork, engine, Arc::new(Noop)).with_seed(7)
    }

    fn address(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn tx() -> TransactionContext {
        TransactionContext::new(address(1), U256::one())
    }

    #[test]
    fn test_fork_tables() {
        assert!(!Fork::Standard.opcodes().contains(crate::opcodes::Opcode::Encrypt));
        assert!(Fork::Homomorphic.opcodes().contains(crate::opcodes::Opcode::Encrypt));
        assert_eq!(Fork::default(), Fork::Homomorphic);
        assert_eq!(Fork::Standard.to_string(), "standard");
    }

    #[test]
    fn test_zero_value_touches_without_balance_read() {
        let mut state = MemoryState::new();
        let message = Message::call(address(1), address(2), U256::zero(), 1000);
        let computation = executor(Fork::Standard)
            .apply_message(&mut state, message, &tx())
            .unwrap();
        assert!(computation.is_success());
        assert!(state.is_touched(&address(2)));
        assert_eq!(state.open_snapshots(), 0);
    }

    #[test]
    fn test_depth_limit_releases_snapshot() {
        let mut state = MemoryState::new().with_balance(address(1), U256::from(10u64));
        let message = Message::call(address(1), address(2), U256::from(5u64), 1000)
            .with_depth(STACK_DEPTH_LIMIT + 1);
        let result = executor(Fork::Standard).apply_message(&mut state, message, &tx());
        assert!(matches!(
            result,
            Err(MessageError::StackDepthLimit { depth, limit })
                if depth == STACK_DEPTH_LIMIT + 1 && limit == STACK_DEPTH_LIMIT
        ));
        assert_eq!(state.open_snapshots(), 0);
        assert_eq!(state.balance(&address(1)), U256::from(10u64));
        assert!(!state.is_touched(&address(2)));
    }

    #[test]
    fn test_depth_at_limit_is_allowed() {
        let mut state = MemoryState::new();
        let message = Message::call(address(1), address(2), U256::zero(), 1000)
            .with_depth(STACK_DEPTH_LIMIT);
        assert!(executor(Fork::Standard)
            .apply_message(&mut state, message, &tx())
            .is_ok());
    }

    #[test]
    fn test_homomorphic_session_released() {
        let mut state = MemoryState::new();
        let message = Message::call(address(1), address(2), U256::zero(), 1000);
        let computation = executor(Fork::Homomorphic)
            .apply_message(&mut state, message, &tx())
            .unwrap();
        assert!(computation.is_success());
        assert!(!computation.has_evaluation_context());
    }

    #[test]
    fn test_precompile_dispatch() {
        let mut state = MemoryState::new();
        let identity = crate::precompiles::fhe_precompile_addresses()[3];
        let message = Message::call(address(1), identity, U256::zero(), 1000).with_data(vec![9, 8]);
        let computation = executor(Fork::Standard)
            .apply_message(&mut state, message, &tx())
            .unwrap();
        assert_eq!(computation.output(), &[9, 8]);
    }

    #[test]
    fn test_without_value_transfer() {
        let mut state = MemoryState::new();
        let message =
            Message::call(address(1), address(2), U256::from(50u64), 1000).without_value_transfer();
        let computation = executor(Fork::Standard)
            .apply_message(&mut state, message, &tx())
            .unwrap();
        assert!(computation.is_success());
        assert_eq!(state.balance(&address(2)), U256::zero());
    }
}
