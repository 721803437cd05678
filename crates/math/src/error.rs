//! # Math Error Types

use thiserror::Error;

/// Errors raised by the fixed-point routines
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Math overflow in {0}")]
    Overflow(&'static str),

    #[error("Math underflow in {0}")]
    Underflow(&'static str),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Tick {0} outside supported range")]
    TickOutOfRange(i64),

    #[error("Sqrt price {0} outside supported range")]
    SqrtPriceOutOfRange(u128),

    #[error("Invalid tick spacing {0}")]
    InvalidTickSpacing(i32),

    #[error("Conversion error: {0}")]
    Conversion(&'static str),
}

/// Result type using math errors
pub type MathResult<T> = Result<T, MathError>;
