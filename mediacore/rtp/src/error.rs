//! RTP module error types.
//!
//! All errors are wrapped in `RtpError` for consistent error handling, the
//! same shape this workspace's other leaf crates use for their own error
//! enums.

use std::fmt;

pub type Result<T> = std::result::Result<T, RtpError>;

/// RTP-related errors.
#[derive(Debug)]
pub enum RtpError {
    InvalidPacket(String),
    Parse(String),
    UnsupportedDon,
}

impl fmt::Display for RtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtpError::InvalidPacket(msg) => write!(f, "Invalid packet: {}", msg),
            RtpError::Parse(msg) => write!(f, "Parse error: {}", msg),
            RtpError::UnsupportedDon => {
                write!(f, "DON-present aggregation/fragmentation packet is not supported")
            }
        }
    }
}

impl std::error::Error for RtpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_packet() {
        let err = RtpError::InvalidPacket("header too short".to_string());
        assert_eq!(err.to_string(), "Invalid packet: header too short");
    }

    #[test]
    fn display_is_error_trait() {
        let err = RtpError::UnsupportedDon;
        let _: &dyn std::error::Error = &err;
    }
}
