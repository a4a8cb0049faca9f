pub mod air;
pub mod error;
pub mod lir;
pub mod pretty;

// Alias for error types
pub type Error = crate::error::ImportError;
pub type Result<T> = crate::error::Result<T>;
