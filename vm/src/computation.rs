use std::sync::Arc;

use fhe_common::{crypto::EvaluationContext, U256};
use log::trace;

use crate::{
    gas::GasMeter,
    message::{Message, TransactionContext},
    opcodes::{Opcode, OpcodeTable},
    stack::Stack,
    VmError,
};

/// Execution state and result of one message
///
/// The behaviour of a computation is chosen by composition: the opcode
/// table of its fork decides what each opcode does, and the optional
/// evaluation context enables the handlers that work on ciphertexts.
pub struct Computation {
    message: Message,
    transaction_context: TransactionContext,
    opcodes: Arc<OpcodeTable>,
    evaluation: Option<EvaluationContext>,
    stack: Stack,
    gas_meter: GasMeter,
    output: Vec<u8>,
    error: Option<VmError>,
}

impl Computation {
    pub fn new(
        message: Message,
        transaction_context: TransactionContext,
        opcodes: Arc<OpcodeTable>,
        evaluation: Option<EvaluationContext>,
    ) -> Self {
        let gas_meter = GasMeter::new(message.gas);
        Self {
            message,
            transaction_context,
            opcodes,
            evaluation,
            stack: Stack::new(),
            gas_meter,
            output: Vec::new(),
            error: None,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn transaction_context(&self) -> &TransactionContext {
        &self.transaction_context
    }

    pub fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Evaluation context of the frame, required by the homomorphic handlers
    pub fn evaluation_context(&self) -> Result<&EvaluationContext, VmError> {
        self.evaluation
            .as_ref()
            .ok_or(VmError::MissingEvaluationContext)
    }

    pub fn has_evaluation_context(&self) -> bool {
        self.evaluation.is_some()
    }

    /// Drop the evaluation context, releasing its device and keys
    pub fn release_evaluation_context(&mut self) {
        self.evaluation = None;
    }

    pub fn stack_push_word(&mut self, value: U256) {
        self.stack.push_word(value);
    }

    pub fn stack_pop_words<const N: usize>(&mut self) -> Result<[U256; N], VmError> {
        self.stack.pop_words::<N>()
    }

    pub fn consume_gas(&mut self, amount: u64, reason: &str) -> Result<(), VmError> {
        self.gas_meter.consume_gas(amount, reason)
    }

    pub fn return_gas(&mut self, amount: u64) {
        self.gas_meter.return_gas(amount)
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_meter.gas_remaining()
    }

    /// Gas used by the computation, everything when it errored
    pub fn gas_used(&self) -> u64 {
        self.gas_meter.gas_used()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn set_output(&mut self, output: Vec<u8>) {
        self.output = output;
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    pub fn error(&self) -> Option<&VmError> {
        self.error.as_ref()
    }

    /// Mark the computation as failed
    ///
    /// Output of a failed computation is discarded and its remaining gas
    /// is burnt.
    pub fn set_error(&mut self, error: VmError) {
        trace!("Computation error: {}", error);
        self.output.clear();
        self.gas_meter.exhaust();
        self.error = Some(error);
    }

    /// Run the handler registered for `byte` in this computation's table
    pub fn execute_opcode(&mut self, byte: u8) -> Result<(), VmError> {
        let opcode = Opcode::try_from(byte)?;
        let handler = self
            .opcodes
            .get(opcode)
            .ok_or(VmError::InvalidOpcode(byte))?;
        trace!("OPCODE: {}", opcode);
        handler(self)
    }
}

impl std::fmt::Debug for Computation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation")
            .field("storage_address", &self.message.storage_address)
            .field("depth", &self.message.depth)
            .field("stack_len", &self.stack.len())
            .field("gas_remaining", &self.gas_meter.gas_remaining())
            .field("output_len", &self.output.len())
            .field("error", &self.error)
            .field("homomorphic", &self.evaluation.is_some())
            .finish()
    }
}
