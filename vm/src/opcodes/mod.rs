//! Opcode handlers
//!
//! Every handler pops its operands with an explicit type hint, computes a
//! result and pushes exactly one entry. Handlers are plain function
//! pointers registered in an [`OpcodeTable`]; each fork builds its own table
//! once and shares it between computations.
//!
//! # Bitwise policy
//!
//! `AND`, `OR` and `XOR` always work on plaintext words. In the homomorphic
//! table `NOT` and the encrypted family (`ENCRYPT`, `DECRYPT`, `EAND`,
//! `EOR`, `EXOR`) go through the gate engine; plaintext operands of these
//! opcodes are encrypted first, and `DECRYPT` is the only way back to a
//! plaintext word.

mod bitwise;
mod comparison;
mod homomorphic;

pub use bitwise::*;
pub use comparison::*;
pub use homomorphic::*;

use std::{collections::HashMap, sync::Arc};

use lazy_static::lazy_static;
use strum::{Display, EnumIter, FromRepr};

use crate::{Computation, VmError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    // Comparison
    Lt = 0x10,
    Gt = 0x11,
    Slt = 0x12,
    Sgt = 0x13,
    Eq = 0x14,
    IsZero = 0x15,
    // Bitwise
    And = 0x16,
    Or = 0x17,
    Xor = 0x18,
    Not = 0x19,
    Byte = 0x1a,
    // Encrypted words
    Encrypt = 0xc0,
    Decrypt = 0xc1,
    EAnd = 0xc2,
    EOr = 0xc3,
    EXor = 0xc4,
}

impl TryFrom<u8> for Opcode {
    type Error = VmError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::from_repr(byte).ok_or(VmError::InvalidOpcode(byte))
    }
}

pub type OpcodeHandler = fn(&mut Computation) -> Result<(), VmError>;

/// Mapping from opcode to handler, fixed once built
#[derive(Clone, Default)]
pub struct OpcodeTable {
    handlers: HashMap<Opcode, OpcodeHandler>,
}

impl OpcodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plaintext semantics for every opcode of the base instruction set
    pub fn standard() -> Self {
        Self::new()
            .with_handler(Opcode::Lt, lt)
            .with_handler(Opcode::Gt, gt)
            .with_handler(Opcode::Slt, slt)
            .with_handler(Opcode::Sgt, sgt)
            .with_handler(Opcode::Eq, eq)
            .with_handler(Opcode::IsZero, iszero)
            .with_handler(Opcode::And, and_op)
            .with_handler(Opcode::Or, or_op)
            .with_handler(Opcode::Xor, xor)
            .with_handler(Opcode::Not, not_op)
            .with_handler(Opcode::Byte, byte_op)
    }

    /// Standard table with `NOT` and the encrypted family on the gate engine
    pub fn homomorphic() -> Self {
        Self::standard()
            .with_handler(Opcode::Not, encrypted_not)
            .with_handler(Opcode::Encrypt, encrypt)
            .with_handler(Opcode::Decrypt, decrypt)
            .with_handler(Opcode::EAnd, encrypted_and)
            .with_handler(Opcode::EOr, encrypted_or)
            .with_handler(Opcode::EXor, encrypted_xor)
    }

    /// Register or replace the handler of an opcode
    pub fn with_handler(mut self, opcode: Opcode, handler: OpcodeHandler) -> Self {
        self.handlers.insert(opcode, handler);
        self
    }

    pub fn get(&self, opcode: Opcode) -> Option<OpcodeHandler> {
        self.handlers.get(&opcode).copied()
    }

    pub fn contains(&self, opcode: Opcode) -> bool {
        self.handlers.contains_key(&opcode)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

lazy_static! {
    pub static ref STANDARD_OPCODES: Arc<OpcodeTable> = Arc::new(OpcodeTable::standard());
    pub static ref FHE_OPCODES: Arc<OpcodeTable> = Arc::new(OpcodeTable::homomorphic());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::message::{Message, TransactionContext};
    use fhe_common::{
        crypto::{DevicePreference, EngineConfig, GateEngine},
        Address, U256,
    };
    use strum::IntoEnumIterator;

    pub fn computation(table: &Arc<OpcodeTable>, homomorphic: bool) -> Computation {
        let evaluation = homomorphic.then(|| {
            GateEngine::new(EngineConfig {
                device: DevicePreference::Software,
                lwe_dimension: 32,
                ..EngineConfig::default()
            })
            .create_session(42)
            .unwrap()
        });
        Computation::new(
            Message::call(Address::zero(), Address::zero(), U256::zero(), 1_000_000),
            TransactionContext::new(Address::zero(), U256::one()),
            table.clone(),
            evaluation,
        )
    }

    /// Push `operands` (first one ends on top), run `opcode` and pop the result word
    pub fn run(computation: &mut Computation, opcode: Opcode, operands: &[U256]) -> U256 {
        for value in operands.iter().rev() {
            computation.stack_push_word(*value);
        }
        computation.execute_opcode(opcode as u8).unwrap();
        assert_eq!(computation.stack().len(), 1);
        computation.stack_mut().pop_word().unwrap()
    }

    #[test]
    fn test_opcode_bytes() {
        for opcode in Opcode::iter() {
            assert_eq!(Opcode::try_from(opcode as u8).unwrap(), opcode);
        }
        assert_eq!(Opcode::try_from(0x00), Err(VmError::InvalidOpcode(0x00)));
        assert_eq!(Opcode::IsZero.to_string(), "ISZERO");
        assert_eq!(Opcode::EXor.to_string(), "EXOR");
    }

    #[test]
    fn test_tables() {
        let standard = OpcodeTable::standard();
        let homomorphic = OpcodeTable::homomorphic();
        assert_eq!(standard.len(), 11);
        assert!(!standard.contains(Opcode::Encrypt));
        assert_eq!(homomorphic.len(), Opcode::iter().count());
        assert!(OpcodeTable::new().is_empty());
    }

    #[test]
    fn test_unregistered_opcode() {
        let mut c = computation(&STANDARD_OPCODES, false);
        c.stack_push_word(U256::one());
        assert_eq!(
            c.execute_opcode(Opcode::Encrypt as u8),
            Err(VmError::InvalidOpcode(0xc0))
        );
        assert_eq!(c.execute_opcode(0xfe), Err(VmError::InvalidOpcode(0xfe)));
    }

    #[test]
    fn test_fork_extension() {
        fn push_seven(computation: &mut Computation) -> Result<(), VmError> {
            computation.stack_mut().pop_word()?;
            computation.stack_push_word(U256::from(7u64));
            Ok(())
        }

        let table = Arc::new(OpcodeTable::standard().with_handler(Opcode::IsZero, push_seven));
        let mut c = computation(&table, false);
        assert_eq!(run(&mut c, Opcode::IsZero, &[U256::zero()]), U256::from(7u64));
    }
}
