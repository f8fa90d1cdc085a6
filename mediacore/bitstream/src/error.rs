//! Error type for bitstream parsing failures.

use std::fmt;

pub type Result<T> = std::result::Result<T, BitstreamError>;

/// Errors produced while parsing H.26x bitstream syntax.
#[derive(Debug)]
pub enum BitstreamError {
    /// Ran out of bits before a syntax element finished decoding.
    Underflow(&'static str),
    /// A decoded field value was outside the range the syntax allows.
    RangeCheck { field: &'static str, value: u32 },
}

impl fmt::Display for BitstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitstreamError::Underflow(what) => {
                write!(f, "ran out of bits while parsing {}", what)
            }
            BitstreamError::RangeCheck { field, value } => {
                write!(f, "{} out of range: {}", field, value)
            }
        }
    }
}

impl std::error::Error for BitstreamError {}
