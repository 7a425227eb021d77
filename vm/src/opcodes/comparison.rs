use fhe_common::{word::to_signed, U256};

use crate::{Computation, VmError};

fn flag(condition: bool) -> U256 {
    if condition {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Lesser comparison
pub fn lt(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?;
    computation.stack_push_word(flag(left < right));
    Ok(())
}

/// Greater comparison
pub fn gt(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?;
    computation.stack_push_word(flag(left > right));
    Ok(())
}

/// Signed lesser comparison
pub fn slt(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?.map(to_signed);
    computation.stack_push_word(flag(left < right));
    Ok(())
}

/// Signed greater comparison
pub fn sgt(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?.map(to_signed);
    computation.stack_push_word(flag(left > right));
    Ok(())
}

/// Equality
pub fn eq(computation: &mut Computation) -> Result<(), VmError> {
    let [left, right] = computation.stack_pop_words::<2>()?;
    computation.stack_push_word(flag(left == right));
    Ok(())
}

pub fn iszero(computation: &mut Computation) -> Result<(), VmError> {
    let value = computation.stack_mut().pop_word()?;
    computation.stack_push_word(flag(value.is_zero()));
    Ok(())
}
