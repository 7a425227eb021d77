use log::trace;

use crate::VmError;

/// Gas accounting of a single computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    start_gas: u64,
    gas_remaining: u64,
}

impl GasMeter {
    pub fn new(start_gas: u64) -> Self {
        Self {
            start_gas,
            gas_remaining: start_gas,
        }
    }

    pub fn start_gas(&self) -> u64 {
        self.start_gas
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    pub fn gas_used(&self) -> u64 {
        self.start_gas - self.gas_remaining
    }

    /// Consume gas, failing without any change if not enough remains
    pub fn consume_gas(&mut self, amount: u64, reason: &str) -> Result<(), VmError> {
        if amount > self.gas_remaining {
            return Err(VmError::OutOfGas {
                requested: amount,
                remaining: self.gas_remaining,
                reason: reason.to_string(),
            });
        }

        self.gas_remaining -= amount;
        trace!(
            "GAS CONSUMPTION: {} - {} -> {} ({})",
            self.gas_remaining + amount,
            amount,
            self.gas_remaining,
            reason
        );
        Ok(())
    }

    /// Give back gas, never above the starting amount
    pub fn return_gas(&mut self, amount: u64) {
        self.gas_remaining = self
            .gas_remaining
            .saturating_add(amount)
            .min(self.start_gas);
    }

    /// Burn everything left, used when the computation errors
    pub fn exhaust(&mut self) {
        self.gas_remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_and_return() {
        let mut meter = GasMeter::new(100);
        meter.consume_gas(30, "test").unwrap();
        assert_eq!(meter.gas_remaining(), 70);
        assert_eq!(meter.gas_used(), 30);

        meter.return_gas(50);
        assert_eq!(meter.gas_remaining(), 100);
    }

    #[test]
    fn test_out_of_gas_keeps_remaining() {
        let mut meter = GasMeter::new(10);
        let err = meter.consume_gas(11, "too much").unwrap_err();
        assert_eq!(
            err,
            VmError::OutOfGas {
                requested: 11,
                remaining: 10,
                reason: "too much".to_string()
            }
        );
        assert_eq!(meter.gas_remaining(), 10);
    }

    #[test]
    fn test_exhaust() {
        let mut meter = GasMeter::new(10);
        meter.consume_gas(3, "test").unwrap();
        meter.exhaust();
        assert_eq!(meter.gas_remaining(), 0);
        assert_eq!(meter.gas_used(), 10);
    }
}
