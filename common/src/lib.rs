pub mod address;
pub mod config;
pub mod crypto;
pub mod word;

pub use address::Address;
pub use primitive_types::U256;

/// Compile-time assertion evaluated in a const context
#[macro_export]
macro_rules! static_assert {
    ($cond:expr, $msg:expr $(,)?) => {
        const _: () = assert!($cond, $msg);
    };
}
