//! Intrinsic (built-in) object implementations.

pub mod proxy;
