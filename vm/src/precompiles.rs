use std::{collections::HashMap, fmt, sync::Arc};

use fhe_common::{
    config::{
        PRECOMPILE_ECRECOVER, PRECOMPILE_IDENTITY, PRECOMPILE_RIPEMD160, PRECOMPILE_SHA256,
    },
    Address,
};

use crate::{Computation, VmError};

pub type Precompile = Arc<dyn Fn(&mut Computation) -> Result<(), VmError> + Send + Sync>;

/// Address of a precompile, the id stored in the last byte
pub fn precompile_address(id: u8) -> Address {
    Address::from_bytes_padded(&[id])
}

/// Addresses reserved for precompiles in the homomorphic fork
pub fn fhe_precompile_addresses() -> [Address; 4] {
    [
        PRECOMPILE_ECRECOVER,
        PRECOMPILE_SHA256,
        PRECOMPILE_RIPEMD160,
        PRECOMPILE_IDENTITY,
    ]
    .map(precompile_address)
}

/// Copy the call data to the output
pub fn identity(computation: &mut Computation) -> Result<(), VmError> {
    let words = computation.message().data.len().div_ceil(32) as u64;
    computation.consume_gas(15 + 3 * words, "Identity precompile")?;
    let data = computation.message().data.to_vec();
    computation.set_output(data);
    Ok(())
}

/// Native functions run in place of contract code at fixed addresses
#[derive(Clone, Default)]
pub struct PrecompileRegistry {
    precompiles: HashMap<Address, Precompile>,
}

impl PrecompileRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built in identity precompile
    ///
    /// The hashing and signature precompiles are supplied by the embedder
    /// through [`PrecompileRegistry::register`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(precompile_address(PRECOMPILE_IDENTITY), Arc::new(identity));
        registry
    }

    /// Register or replace the precompile at `address`
    pub fn register(&mut self, address: Address, precompile: Precompile) {
        self.precompiles.insert(address, precompile);
    }

    pub fn get(&self, address: &Address) -> Option<&Precompile> {
        self.precompiles.get(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.precompiles.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.precompiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.precompiles.is_empty()
    }
}

impl fmt::Debug for PrecompileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.precompiles.keys()).finish()
    }
}
