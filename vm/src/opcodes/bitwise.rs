use fhe_common::{config::WORD_BYTES, U256};

use crate::{Computation, VmError};

/// Bitwise and
pub fn and_op(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?;
    computation.stack_push_word(left & right);
    Ok(())
}

/// Bitwise or
pub fn or_op(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?;
    computation.stack_push_word(left | right);
    Ok(())
}

/// Bitwise xor
pub fn xor(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?;
    computation.stack_push_word(left ^ right);
    Ok(())
}

/// Plaintext bitwise not, used by forks without a gate engine
pub fn not_op(computation: &mut Computation) -> Result<(), VmError> {
    let value = computation.stack_mut().pop_word()?;
    computation.stack_push_word(!value);
    Ok(())
}

/// Single byte of a word, position 0 being the most significant byte
pub fn byte_op(computation: &mut Computation) -> Result<(), VmError> {
    let [position, value] = computation.stack_pop_words::<2>()?;

    let result = if position >= U256::from(WORD_BYTES) {
        U256::zero()
    } else {
        // byte() counts from the least significant byte
        U256::from(value.byte(WORD_BYTES - 1 - position.as_usize()))
    };

    computation.stack_push_word(result);
    Ok(())
}
