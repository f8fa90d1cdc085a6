//! TCP accept loop and per-connection handler for the RTMP ingest server.

mod connection_handler;
mod server;

pub use server::RtmpServer;
