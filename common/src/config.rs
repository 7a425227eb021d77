use crate::static_assert;

// ===== WORDS =====

// Native word size of the machine
pub const WORD_BITS: usize = 256;
pub const WORD_BYTES: usize = WORD_BITS / 8;

// ===== MESSAGE APPLICATION =====

// Maximum nesting of message calls
// A message with a depth above this limit is rejected before any state is touched
pub const STACK_DEPTH_LIMIT: usize = 1024;

// Gas charged per byte of code stored by a contract creation
pub const GAS_CODEDEPOSIT: u64 = 200;

// ===== PRECOMPILES =====

// Addresses of the precompiled contracts available in the homomorphic fork
// Each is the last byte of an otherwise zero 20 bytes address
pub const PRECOMPILE_ECRECOVER: u8 = 0x01;
pub const PRECOMPILE_SHA256: u8 = 0x02;
pub const PRECOMPILE_RIPEMD160: u8 = 0x03;
pub const PRECOMPILE_IDENTITY: u8 = 0x04;

// ===== GATE ENGINE =====

// LWE dimension used by the software gate device
// Matches the default parameter set of the accelerated backend
pub const DEFAULT_LWE_DIMENSION: usize = 500;
// Anything smaller offers no meaningful hiding of the plaintext bits
pub const MIN_LWE_DIMENSION: usize = 16;

// Number of bits dispatched to the device per lock acquisition
pub const DEFAULT_TRANSFORMS_PER_BLOCK: usize = 1;

// Torus encoding of a boolean: true = +1/8, false = -1/8
pub const GATE_MU: u32 = 1 << 29;
// Bound of the uniform noise added on every fresh encryption
// Two refreshed inputs doubled by XOR stay far below GATE_MU
pub const GATE_NOISE_BOUND: i32 = 1 << 20;

// Static checks
static_assert!(
    WORD_BITS % 8 == 0,
    "Word size must be a whole number of bytes"
);
static_assert!(
    (GATE_NOISE_BOUND as u32) * 8 < GATE_MU,
    "Gate noise must stay below the XOR decision margin"
);
static_assert!(
    MIN_LWE_DIMENSION <= DEFAULT_LWE_DIMENSION,
    "Default LWE dimension must satisfy the minimum"
);
