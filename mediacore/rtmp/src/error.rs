//! RTMP error taxonomy.
//!
//! Transport failures close the connection immediately, protocol/auth
//! failures get a best-effort `_error` command before closing, parse
//! failures drop the offending frame/chunk and keep the connection alive.

use std::fmt;

pub type Result<T> = std::result::Result<T, RtmpError>;

#[derive(Debug)]
pub enum RtmpError {
    Transport(String),
    Protocol(String),
    Auth(String),
    Parse(String),
    Resource(String),
    Timeout,
}

impl fmt::Display for RtmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtmpError::Transport(msg) => write!(f, "transport error: {}", msg),
            RtmpError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            RtmpError::Auth(msg) => write!(f, "auth error: {}", msg),
            RtmpError::Parse(msg) => write!(f, "parse error: {}", msg),
            RtmpError::Resource(msg) => write!(f, "resource error: {}", msg),
            RtmpError::Timeout => write!(f, "timeout"),
        }
    }
}

impl std::error::Error for RtmpError {}

/// Exit codes emitted by the connection event-loop on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    ReadError = 1,
    ParseError = 2,
    PollError = 3,
    PollTimeout = 4,
    Disconnected = 5,
}
