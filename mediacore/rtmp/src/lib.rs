//! RTMP ingest protocol engine: handshake, chunk framing, AMF0 commands,
//! and the connection state machine tying them together.

pub mod amf;
pub mod chunk;
pub mod command;
pub mod connection;
pub mod error;
pub mod handshake;
pub mod message;

pub use amf::AmfValue;
pub use command::{ApplicationRegistry, CommandMessage, NetStreamState};
pub use connection::{ConnectionState, NetStream, RtmpConnection, RtmpEvent};
pub use error::{ExitCode, Result, RtmpError};
pub use message::RtmpMessage;
