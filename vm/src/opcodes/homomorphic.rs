use fhe_common::crypto::{EncryptedWord, Gate};

use crate::{stack::EntryKind, Computation, VmError};

// Handlers fail before popping anything when there is no engine session
fn require_engine(computation: &Computation) -> Result<(), VmError> {
    computation.evaluation_context().map(|_| ())
}

// Pop one operand as ciphertext, encrypting it first when it is a plaintext word
fn pop_encrypted_operand(computation: &mut Computation) -> Result<EncryptedWord, VmError> {
    match computation.stack().peek_kind() {
        Some(EntryKind::Word) => {
            let value = computation.stack_mut().pop_word()?;
            Ok(computation.evaluation_context()?.encrypt_word(value)?)
        }
        _ => computation.stack_mut().pop_encrypted(),
    }
}

fn binary_gate(computation: &mut Computation, gate: Gate) -> Result<(), VmError> {
    require_engine(computation)?;
    let available = computation.stack().len();
    if available < 2 {
        return Err(VmError::StackUnderflow {
            needed: 2,
            available,
        });
    }

    let left = pop_encrypted_operand(computation)?;
    let right = pop_encrypted_operand(computation)?;
    let ctx = computation.evaluation_context()?;
    let result = match gate {
        Gate::And => ctx.and(&left, &right)?,
        Gate::Or => ctx.or(&left, &right)?,
        Gate::Xor => ctx.xor(&left, &right)?,
    };

    computation.stack_mut().push_encrypted(result);
    Ok(())
}

/// Homomorphic bitwise not
///
/// A plaintext operand is decomposed into bits and encrypted before the
/// gate is applied; the result stays encrypted.
pub fn encrypted_not(computation: &mut Computation) -> Result<(), VmError> {
    require_engine(computation)?;
    let value = pop_encrypted_operand(computation)?;
    let result = computation.evaluation_context()?.not(&value)?;
    computation.stack_mut().push_encrypted(result);
    Ok(())
}

/// Encrypt a plaintext word
pub fn encrypt(computation: &mut Computation) -> Result<(), VmError> {
    require_engine(computation)?;
    let value = computation.stack_mut().pop_word()?;
    let encrypted = computation.evaluation_context()?.encrypt_word(value)?;
    computation.stack_mut().push_encrypted(encrypted);
    Ok(())
}

/// Decrypt an encrypted word back to plaintext
pub fn decrypt(computation: &mut Computation) -> Result<(), VmError> {
    require_engine(computation)?;
    let value = computation.stack_mut().pop_encrypted()?;
    let decrypted = computation.evaluation_context()?.decrypt_word(&value)?;
    computation.stack_push_word(decrypted);
    Ok(())
}

pub fn encrypted_and(computation: &mut Computation) -> Result<(), VmError> {
    binary_gate(computation, Gate::And)
}

pub fn encrypted_or(computation: &mut Computation) -> Result<(), VmError> {
    binary_gate(computation, Gate::Or)
}

pub fn encrypted_xor(computation: &mut Computation) -> Result<(), VmError> {
    binary_gate(computation, Gate::Xor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{tests::computation, Opcode, FHE_OPCODES};
    use fhe_common::U256;

    fn word(value: u64) -> U256 {
        U256::from(value)
    }

    #[test]
    fn test_not_encrypts_plaintext_operand() {
        let mut c = computation(&FHE_OPCODES, true);
        c.stack_push_word(word(0x0f));
        c.execute_opcode(Opcode::Not as u8).unwrap();

        assert_eq!(c.stack().peek_kind(), Some(EntryKind::Encrypted));
        // plaintext consumers reject the ciphertext
        assert_eq!(
            c.execute_opcode(Opcode::IsZero as u8),
            Err(VmError::TypeMismatch {
                expected: EntryKind::Word,
                actual: EntryKind::Encrypted
            })
        );

        c.execute_opcode(Opcode::Decrypt as u8).unwrap();
        assert_eq!(c.stack_mut().pop_word().unwrap(), !word(0x0f));
    }

    #[test]
    fn test_not_twice_is_identity() {
        let mut c = computation(&FHE_OPCODES, true);
        let value = U256::MAX - word(0xdead_beef);
        c.stack_push_word(value);
        c.execute_opcode(Opcode::Encrypt as u8).unwrap();
        c.execute_opcode(Opcode::Not as u8).unwrap();
        c.execute_opcode(Opcode::Not as u8).unwrap();
        c.execute_opcode(Opcode::Decrypt as u8).unwrap();
        assert_eq!(c.stack_mut().pop_word().unwrap(), value);
        assert!(c.stack().is_empty());
    }

    #[test]
    fn test_encrypted_binary_gates_with_mixed_operands() {
        let cases = [
            (Opcode::EAnd, 0b1100u64 & 0b1010),
            (Opcode::EOr, 0b1100 | 0b1010),
            (Opcode::EXor, 0b1100 ^ 0b1010),
        ];
        for (opcode, expected) in cases {
            let mut c = computation(&FHE_OPCODES, true);
            c.stack_push_word(word(0b1010));
            c.execute_opcode(Opcode::Encrypt as u8).unwrap();
            c.stack_push_word(word(0b1100));
            c.execute_opcode(opcode as u8).unwrap();
            c.execute_opcode(Opcode::Decrypt as u8).unwrap();
            assert_eq!(c.stack_mut().pop_word().unwrap(), word(expected), "{}", opcode);
        }
    }

    #[test]
    fn test_binary_gate_underflow() {
        let mut c = computation(&FHE_OPCODES, true);
        c.stack_push_word(word(1));
        assert_eq!(
            c.execute_opcode(Opcode::EAnd as u8),
            Err(VmError::StackUnderflow {
                needed: 2,
                available: 1
            })
        );
        assert_eq!(c.stack().len(), 1);
    }

    #[test]
    fn test_missing_evaluation_context_keeps_operands() {
        let mut c = computation(&FHE_OPCODES, false);
        c.stack_push_word(word(2));
        c.stack_push_word(word(1));
        for opcode in [Opcode::Not, Opcode::Encrypt, Opcode::EAnd, Opcode::EOr, Opcode::EXor] {
            assert_eq!(
                c.execute_opcode(opcode as u8),
                Err(VmError::MissingEvaluationContext),
                "{}",
                opcode
            );
            assert_eq!(c.stack().len(), 2, "{}", opcode);
        }
        assert_eq!(c.stack_pop_words::<2>().unwrap(), [word(1), word(2)]);
    }

    #[test]
    fn test_decrypt_without_context_keeps_ciphertext() {
        let mut with_engine = computation(&FHE_OPCODES, true);
        with_engine.stack_push_word(word(5));
        with_engine.execute_opcode(Opcode::Encrypt as u8).unwrap();
        let encrypted = with_engine.stack_mut().pop_encrypted().unwrap();

        let mut c = computation(&FHE_OPCODES, false);
        c.stack_mut().push_encrypted(encrypted);
        assert_eq!(
            c.execute_opcode(Opcode::Decrypt as u8),
            Err(VmError::MissingEvaluationContext)
        );
        assert_eq!(c.stack().peek_kind(), Some(EntryKind::Encrypted));
    }

    #[test]
    fn test_decrypt_rejects_plaintext() {
        let mut c = computation(&FHE_OPCODES, true);
        c.stack_push_word(word(1));
        assert!(matches!(
            c.execute_opcode(Opcode::Decrypt as u8),
            Err(VmError::TypeMismatch { .. })
        ));
    }
}
