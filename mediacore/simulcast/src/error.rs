//! Simulcast error taxonomy.
//!
//! Unexpected ssrc or negative normalized timestamps are soft failures: the
//! frame is dropped and logged, never propagated as a hard error to the
//! caller. `SimulcastError` exists for the few conditions that are genuinely
//! caller mistakes.

use std::fmt;

pub type Result<T> = std::result::Result<T, SimulcastError>;

#[derive(Debug)]
pub enum SimulcastError {
    Config(String),
}

impl fmt::Display for SimulcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulcastError::Config(msg) => write!(f, "simulcast config error: {}", msg),
        }
    }
}

impl std::error::Error for SimulcastError {}
