use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_LWE_DIMENSION, DEFAULT_TRANSFORMS_PER_BLOCK};

/// Which device backs a new session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// Use an accelerator when present, otherwise the software device
    #[default]
    Auto,
    /// Always evaluate on the CPU
    Software,
    /// Require an accelerator, session creation fails without one
    Accelerator,
}

/// Tuning knobs of the gate evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceParameters {
    /// Bits dispatched to the device per lock acquisition
    pub transforms_per_block: usize,
    /// Ask the device to refresh all bits of a dispatch in one kernel launch
    ///
    /// Only changes scheduling on devices that support it, never results.
    /// Handed to custom devices through the engine's device factory; the
    /// software device ignores it.
    pub single_kernel_bootstrap: bool,
}

impl Default for PerformanceParameters {
    fn default() -> Self {
        Self {
            transforms_per_block: DEFAULT_TRANSFORMS_PER_BLOCK,
            single_kernel_bootstrap: false,
        }
    }
}

impl PerformanceParameters {
    // A zero batch would never make progress
    pub(crate) fn batch_size(&self) -> usize {
        self.transforms_per_block.max(1)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub device: DevicePreference,
    pub lwe_dimension: usize,
    pub performance: PerformanceParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: DevicePreference::default(),
            lwe_dimension: DEFAULT_LWE_DIMENSION,
            performance: PerformanceParameters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"device": "software"}"#).unwrap();
        assert_eq!(config.device, DevicePreference::Software);
        assert_eq!(config.lwe_dimension, DEFAULT_LWE_DIMENSION);
        assert_eq!(config.performance, PerformanceParameters::default());
    }

    #[test]
    fn test_zero_batch_is_clamped() {
        let params = PerformanceParameters {
            transforms_per_block: 0,
            single_kernel_bootstrap: true,
        };
        assert_eq!(params.batch_size(), 1);
    }
}
