//! Drives one accepted socket through an [`RtmpConnection`]: reads bytes off
//! the wire, feeds them to the state machine, and writes back whatever it
//! produces, using the same blocking-read-with-timeout loop shape as
//! this workspace's other connection handlers.

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use mediacore::{RtmpConnection, RtmpEvent};

const READ_TIMEOUT: Duration = Duration::from_millis(200);
const READ_BUF_SIZE: usize = 4096;

pub struct ConnectionHandler {
    stream: TcpStream,
    connection: RtmpConnection,
    logger: logging::Logger,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        mut connection: RtmpConnection,
        applications: &[String],
        logger: logging::Logger,
    ) -> io::Result<Self> {
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        for app in applications {
            connection.register_application(app.clone());
        }
        Ok(ConnectionHandler {
            stream,
            connection,
            logger,
        })
    }

    /// Runs the connection to completion: EOF, a transport error, or an
    /// unrecovered protocol error per the error-handling policy (send
    /// `_error` where possible is handled inside `RtmpConnection`; here we
    /// only need to stop feeding bytes and close the socket).
    pub fn handle(&mut self) -> io::Result<()> {
        let peer_addr = self.stream.peer_addr()?;
        self.logger.info(&format!("accepted RTMP connection from {}", peer_addr));

        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    self.logger.info(&format!("{} closed the connection", peer_addr));
                    return Ok(());
                }
                Ok(n) => {
                    if let Err(e) = self.feed_and_flush(&buf[..n]) {
                        self.logger.warn(&format!("protocol error from {}: {}", peer_addr, e));
                        return Err(io::Error::other(e.to_string()));
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    continue;
                }
                Err(e) => {
                    self.logger.error(&format!("read error from {}: {}", peer_addr, e));
                    return Err(e);
                }
            }
        }
    }

    fn feed_and_flush(&mut self, data: &[u8]) -> Result<(), mediacore::RtmpError> {
        let feed_result = self.connection.feed(data);

        // Flush whatever got queued (e.g. a `_error` reject) even when
        // `feed` itself failed, so the peer sees it before we hang up.
        let outbound = self.connection.take_outbound();
        if !outbound.is_empty() {
            self.stream
                .write_all(&outbound)
                .map_err(|e| mediacore::RtmpError::Transport(e.to_string()))?;
        }

        let events = feed_result?;
        for event in events {
            self.handle_event(event);
        }
        Ok(())
    }

    fn handle_event(&self, event: RtmpEvent) {
        match event {
            RtmpEvent::Connected { app_name } => {
                self.logger.info(&format!("connected to application '{}'", app_name));
            }
            RtmpEvent::PublishStarted { stream_id, stream_name } => {
                self.logger
                    .info(&format!("stream {} publishing '{}'", stream_id, stream_name));
            }
            RtmpEvent::PlayStarted { stream_id, stream_name } => {
                self.logger
                    .info(&format!("stream {} playing '{}'", stream_id, stream_name));
            }
            RtmpEvent::Video { stream_id, timestamp, payload } => {
                self.logger.debug(&format!(
                    "stream {} video frame @ {} ({} bytes)",
                    stream_id,
                    timestamp,
                    payload.len()
                ));
            }
            RtmpEvent::Audio { stream_id, timestamp, payload } => {
                self.logger.debug(&format!(
                    "stream {} audio frame @ {} ({} bytes)",
                    stream_id,
                    timestamp,
                    payload.len()
                ));
            }
            RtmpEvent::PauseChanged { stream_id, paused } => {
                self.logger
                    .info(&format!("stream {} {}", stream_id, if paused { "paused" } else { "resumed" }));
            }
            RtmpEvent::ReceiveAudioChanged { stream_id, enabled } => {
                self.logger
                    .info(&format!("stream {} receiveAudio set to {}", stream_id, enabled));
            }
            RtmpEvent::ReceiveVideoChanged { stream_id, enabled } => {
                self.logger
                    .info(&format!("stream {} receiveVideo set to {}", stream_id, enabled));
            }
            RtmpEvent::Disconnected => {
                self.logger.info("connection disconnected");
            }
        }
    }
}
