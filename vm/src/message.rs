use std::sync::Arc;

use fhe_common::{Address, U256};

/// A single contract call or creation
///
/// Immutable once handed to the executor. Code and data are shared, so
/// cloning a message is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub sender: Address,
    pub to: Address,
    /// Account whose storage and balance the call operates on
    pub storage_address: Address,
    /// Account whose code is executed (differs from `to` for delegate calls)
    pub code_address: Address,
    pub value: U256,
    pub gas: u64,
    pub depth: usize,
    pub should_transfer_value: bool,
    pub is_create: bool,
    pub code: Arc<Vec<u8>>,
    pub data: Arc<Vec<u8>>,
}

impl Message {
    /// A plain value-transferring call to `to`
    pub fn call(sender: Address, to: Address, value: U256, gas: u64) -> Self {
        Self {
            sender,
            to,
            storage_address: to,
            code_address: to,
            value,
            gas,
            depth: 0,
            should_transfer_value: true,
            is_create: false,
            code: Arc::new(Vec::new()),
            data: Arc::new(Vec::new()),
        }
    }

    /// A contract creation deploying to `address` with init `code`
    pub fn create(sender: Address, address: Address, value: U256, gas: u64, code: Vec<u8>) -> Self {
        Self {
            is_create: true,
            code: Arc::new(code),
            ..Self::call(sender, address, value, gas)
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_code(mut self, code: Vec<u8>) -> Self {
        self.code = Arc::new(code);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Arc::new(data);
        self
    }

    pub fn without_value_transfer(mut self) -> Self {
        self.should_transfer_value = false;
        self
    }
}

/// Transaction wide values shared by every message of a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionContext {
    pub origin: Address,
    pub gas_price: U256,
}

impl TransactionContext {
    pub fn new(origin: Address, gas_price: U256) -> Self {
        Self { origin, gas_price }
    }
}
