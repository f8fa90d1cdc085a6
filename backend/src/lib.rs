//! RTMP Media Server Library
//!
//! Core library exposing configuration and the TCP accept loop for
//! integration testing.

pub mod config;
pub mod tcp;

pub use config::{FrameDelaySettings, LoggingConfig, MediaServerConfig, RtmpServerConfig, SimulcastSettings};
pub use tcp::RtmpServer;
