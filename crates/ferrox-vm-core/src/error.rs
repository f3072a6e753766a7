//! VM error types

use crate::value::Value;
use thiserror::Error;

/// VM execution errors
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., calling non-function, proxy invariant violation)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error (e.g., over-long argument list)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Internal error
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Stack overflow
    #[error("RangeError: Maximum call stack size exceeded")]
    StackOverflow,

    /// Thrown JS exception
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),
}

/// A thrown JavaScript value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// The thrown value (as a string representation)
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create an exception from a thrown JS value
    pub fn exception(value: Value) -> Self {
        let message = if let Some(s) = value.as_string() {
            s.as_str().to_string()
        } else {
            format!("{:?}", value)
        };
        Self::Exception(Box::new(ThrownValue { message, value }))
    }

    /// True if this is a `TypeError`
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeError(_))
    }

    /// True if this is a `RangeError` (including stack overflow)
    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::RangeError(_) | Self::StackOverflow)
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
