//! Re-exports used by macro-generated code. Not public API.

#[cfg(feature = "auto_register")]
pub use inventory;
