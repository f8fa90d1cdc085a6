//! TCP accept loop for the RTMP ingest server.
//!
//! A dedicated thread owns the listening socket and spawns one thread per
//! accepted connection, each running that connection's handler to
//! completion. TLS termination is dropped here (see `DESIGN.md`): it is an
//! externally-consumed interface, not something this core implements.

use std::io;
use std::net::TcpListener;
use std::thread;

use mediacore::RtmpConnection;

use super::connection_handler::ConnectionHandler;
use crate::config::RtmpServerConfig;

pub struct RtmpServer {
    config: RtmpServerConfig,
    logger: logging::Logger,
}

impl RtmpServer {
    pub fn new(config: RtmpServerConfig, logger: logging::Logger) -> Self {
        RtmpServer { config, logger }
    }

    pub fn start(&self) -> io::Result<()> {
        let bind_addr = format!("{}:{}", self.config.bind_address, self.config.rtmp_port);
        let listener = TcpListener::bind(&bind_addr)?;
        self.logger.info(&format!("RTMP server listening on {}", bind_addr));
        self.serve(listener)
    }

    /// Runs the accept loop against an already-bound listener. Split out
    /// from [`start`](Self::start) so tests can bind an ephemeral port and
    /// drive a real client against it.
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let max_chunk_size = self.config.max_chunk_size;
                    let window_ack_size = self.config.window_ack_size;
                    let applications = self.config.applications.clone();
                    let logger = self
                        .logger
                        .for_component("RtmpConnection")
                        .unwrap_or_else(|_| self.logger.clone());

                    thread::spawn(move || {
                        let connection = RtmpConnection::new(max_chunk_size, window_ack_size, logger.clone());
                        match ConnectionHandler::new(stream, connection, &applications, logger.clone()) {
                            Ok(mut handler) => {
                                if let Err(e) = handler.handle() {
                                    logger.error(&format!("connection handler error: {}", e));
                                }
                            }
                            Err(e) => {
                                logger.error(&format!("failed to set up connection handler: {}", e));
                            }
                        }
                    });
                }
                Err(e) => {
                    self.logger.error(&format!("failed to accept connection: {}", e));
                }
            }
        }

        Ok(())
    }
}
