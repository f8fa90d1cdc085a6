//! Top-level RTMP connection state machine: handshake, then chunk/command
//! dispatch, until the publishing application hands off media frames.
//!
//! Grounded on `rtmpconnection.h`'s `State` enum and field layout
//! (`windowSize`/`curWindowSize`, `maxStreamId`/`maxTransId`, per-stream
//! bookkeeping) — re-expressed here as an explicit `ConnectionState` enum
//! plus a feed-driven parser instead of the original's poll-based
//! `ParseData`, since this workspace drives connections from a blocking
//! `TcpStream` read loop (see `tcp/server.rs`) rather than `poll()`.

use std::collections::HashMap;

use logging::Logger;

use crate::amf::AmfValue;
use crate::chunk::{encode_message, ChunkDecoder};
use crate::command::{ApplicationRegistry, CommandMessage, NetStreamState};
use crate::error::{ExitCode, Result, RtmpError};
use crate::handshake::{self, HandshakeState, C1_SIZE};
use crate::message::{
    self, RtmpMessage, MSG_AMF0_COMMAND, MSG_SET_CHUNK_SIZE, MSG_VIDEO, MSG_AUDIO,
    MSG_WINDOW_ACK_SIZE,
};

/// Coarse connection phase, named after `rtmpconnection.h`'s `State` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    HeaderC0Wait,
    HeaderC1Wait,
    HeaderC2Wait,
    ChunkStreamActive,
    Closed,
}

/// One published or played media stream on a connection.
pub struct NetStream {
    pub stream_id: u32,
    pub state: NetStreamState,
    pub app_name: String,
    pub stream_name: String,
    pub receive_audio: bool,
    pub receive_video: bool,
}

/// A decoded application-layer event the connection's owner reacts to:
/// forwarding media to the simulcast layer, registering a publisher, etc.
#[derive(Debug, Clone)]
pub enum RtmpEvent {
    Connected { app_name: String },
    PublishStarted { stream_id: u32, stream_name: String },
    PlayStarted { stream_id: u32, stream_name: String },
    Video { stream_id: u32, timestamp: u32, payload: Vec<u8> },
    Audio { stream_id: u32, timestamp: u32, payload: Vec<u8> },
    PauseChanged { stream_id: u32, paused: bool },
    ReceiveAudioChanged { stream_id: u32, enabled: bool },
    ReceiveVideoChanged { stream_id: u32, enabled: bool },
    Disconnected,
}

/// Drives one RTMP connection's handshake, chunk reassembly and command
/// dispatch. The owner feeds inbound bytes via [`feed`](Self::feed) and
/// writes whatever [`outbound`](Self::take_outbound) returns back to the
/// socket, mirroring `TcpServer::start`'s per-connection thread loop except
/// the parsing itself is fully synchronous and non-blocking on the caller's
/// read loop.
pub struct RtmpConnection {
    state: ConnectionState,
    handshake_digest: bool,
    own_c1_digest: Option<[u8; 32]>,
    handshake_buffer: Vec<u8>,
    decoder: ChunkDecoder,
    outbound: Vec<u8>,
    max_chunk_size: u32,
    window_ack_size: u32,
    next_stream_id: u32,
    next_transaction_id: f64,
    streams: HashMap<u32, NetStream>,
    applications: ApplicationRegistry<()>,
    app_name: Option<String>,
    logger: Logger,
}

impl RtmpConnection {
    pub fn new(max_chunk_size: u32, window_ack_size: u32, logger: Logger) -> Self {
        let mut decoder = ChunkDecoder::new();
        decoder.set_window_ack_size(window_ack_size);
        RtmpConnection {
            state: ConnectionState::HeaderC0Wait,
            handshake_digest: false,
            own_c1_digest: None,
            handshake_buffer: Vec::new(),
            decoder,
            outbound: Vec::new(),
            max_chunk_size,
            window_ack_size,
            next_stream_id: 1,
            next_transaction_id: 1.0,
            streams: HashMap::new(),
            applications: ApplicationRegistry::new(),
            app_name: None,
            logger,
        }
    }

    pub fn register_application(&mut self, name: impl Into<String>) {
        self.applications.add(name, ());
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drains bytes accumulated for the peer since the last call.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Feeds newly received bytes, returning the application-level events
    /// they produced, in order.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<RtmpEvent>> {
        let mut events = Vec::new();
        let mut remaining = data;

        while !remaining.is_empty() {
            match self.state {
                ConnectionState::Closed => {
                    return Err(RtmpError::Transport("feed after close".to_string()));
                }
                ConnectionState::HeaderC0Wait => {
                    let (consumed, done) = self.feed_c0(remaining)?;
                    remaining = &remaining[consumed..];
                    if !done {
                        break;
                    }
                }
                ConnectionState::HeaderC1Wait => {
                    let (consumed, done) = self.feed_c1(remaining)?;
                    remaining = &remaining[consumed..];
                    if !done {
                        break;
                    }
                }
                ConnectionState::HeaderC2Wait => {
                    let (consumed, done) = self.feed_c2(remaining)?;
                    remaining = &remaining[consumed..];
                    if !done {
                        break;
                    }
                }
                ConnectionState::ChunkStreamActive => {
                    let (messages, ack_due) = self.decoder.feed(remaining)?;
                    remaining = &[];
                    if ack_due {
                        let ack = message::encode_acknowledgement(self.decoder.total_in_bytes() as u32);
                        self.outbound.extend(encode_message(2, &ack, self.max_chunk_size as usize));
                    }
                    for message in messages {
                        self.handle_message(message, &mut events)?;
                    }
                }
            }
        }

        Ok(events)
    }

    fn feed_c0(&mut self, data: &[u8]) -> Result<(usize, bool)> {
        self.handshake_buffer.extend_from_slice(&data[..1.min(data.len())]);
        if self.handshake_buffer.is_empty() {
            return Ok((0, false));
        }
        let version = self.handshake_buffer[0];
        if version != handshake::HANDSHAKE_VERSION {
            return Err(RtmpError::Protocol(format!("unsupported handshake version {}", version)));
        }
        self.outbound.push(handshake::HANDSHAKE_VERSION);
        self.handshake_buffer.clear();
        self.state = ConnectionState::HeaderC1Wait;
        Ok((1, true))
    }

    fn feed_c1(&mut self, data: &[u8]) -> Result<(usize, bool)> {
        let need = C1_SIZE - self.handshake_buffer.len();
        let take = need.min(data.len());
        self.handshake_buffer.extend_from_slice(&data[..take]);
        if self.handshake_buffer.len() < C1_SIZE {
            return Ok((take, false));
        }

        let c1: [u8; C1_SIZE] = self.handshake_buffer[..C1_SIZE].try_into().unwrap();
        self.handshake_digest = handshake::verify_c1(&c1)?;
        if self.handshake_digest {
            self.own_c1_digest = Some(handshake::c1_digest(&c1));
        }

        let now_ms = 0u32; // wall-clock is irrelevant to handshake correctness
        let s1 = handshake::make_s1(now_ms, self.handshake_digest);
        let s2 = handshake::make_s2(&c1, self.handshake_digest);
        self.outbound.extend_from_slice(&s1);
        self.outbound.extend_from_slice(&s2);

        self.handshake_buffer.clear();
        self.state = ConnectionState::HeaderC2Wait;
        self.logger.debug("handshake: sent S1/S2");
        Ok((take, true))
    }

    fn feed_c2(&mut self, data: &[u8]) -> Result<(usize, bool)> {
        let need = C1_SIZE - self.handshake_buffer.len();
        let take = need.min(data.len());
        self.handshake_buffer.extend_from_slice(&data[..take]);
        if self.handshake_buffer.len() < C1_SIZE {
            return Ok((take, false));
        }

        if self.handshake_digest {
            let c2: [u8; C1_SIZE] = self.handshake_buffer[..C1_SIZE].try_into().unwrap();
            let digest = self.own_c1_digest.expect("digest scheme always records own C1 digest");
            handshake::verify_c2(&c2, &digest)?;
        }

        self.handshake_buffer.clear();
        self.state = ConnectionState::ChunkStreamActive;
        self.decoder.set_max_chunk_size(self.max_chunk_size);
        self.logger.info("handshake complete");
        Ok((take, true))
    }

    fn handle_message(&mut self, message: RtmpMessage, events: &mut Vec<RtmpEvent>) -> Result<()> {
        match message.message_type_id {
            MSG_SET_CHUNK_SIZE => {
                let size = message::decode_set_chunk_size(&message)?;
                self.decoder.set_max_chunk_size(size);
            }
            MSG_WINDOW_ACK_SIZE => {
                let size = message::decode_window_ack_size(&message)?;
                self.decoder.set_window_ack_size(size);
            }
            MSG_AMF0_COMMAND => {
                let command = CommandMessage::decode(&message)?;
                self.handle_command(command, message.message_stream_id, events)?;
            }
            MSG_VIDEO => {
                events.push(RtmpEvent::Video {
                    stream_id: message.message_stream_id,
                    timestamp: message.timestamp,
                    payload: message.body,
                });
            }
            MSG_AUDIO => {
                events.push(RtmpEvent::Audio {
                    stream_id: message.message_stream_id,
                    timestamp: message.timestamp,
                    payload: message.body,
                });
            }
            _ => {
                self.logger.debug(&format!("ignoring message type {}", message.message_type_id));
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, command: CommandMessage, stream_id: u32, events: &mut Vec<RtmpEvent>) -> Result<()> {
        match command.name.as_str() {
            "connect" => {
                let app_name = command
                    .command_object
                    .as_object()
                    .and_then(|o| o.get("app"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                if self.applications.resolve(&app_name).is_none() {
                    self.send_connect_rejected(command.transaction_id);
                    return Err(RtmpError::Auth(format!("no registered application for '{}'", app_name)));
                }

                self.app_name = Some(app_name.clone());
                self.send_window_control();
                self.send_connect_result(command.transaction_id);
                events.push(RtmpEvent::Connected { app_name });
            }
            "createStream" => {
                let stream_id = self.next_stream_id;
                self.next_stream_id += 1;
                self.send_create_stream_result(command.transaction_id, stream_id as f64);
            }
            "publish" => {
                let stream_name = command
                    .arguments
                    .first()
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                self.streams.insert(
                    stream_id,
                    NetStream {
                        stream_id,
                        state: NetStreamState::Published,
                        app_name: self.app_name.clone().unwrap_or_default(),
                        stream_name: stream_name.clone(),
                        receive_audio: true,
                        receive_video: true,
                    },
                );
                events.push(RtmpEvent::PublishStarted { stream_id, stream_name });
            }
            "play" => {
                let stream_name = command
                    .arguments
                    .first()
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                self.streams.insert(
                    stream_id,
                    NetStream {
                        stream_id,
                        state: NetStreamState::Playing,
                        app_name: self.app_name.clone().unwrap_or_default(),
                        stream_name: stream_name.clone(),
                        receive_audio: true,
                        receive_video: true,
                    },
                );
                events.push(RtmpEvent::PlayStarted { stream_id, stream_name });
            }
            "pause" => {
                let paused = matches!(command.arguments.first(), Some(AmfValue::Boolean(true)));
                if let Some(stream) = self.streams.get_mut(&stream_id) {
                    stream.state = if paused { NetStreamState::Paused } else { NetStreamState::Playing };
                }
                events.push(RtmpEvent::PauseChanged { stream_id, paused });
            }
            "receiveAudio" => {
                let enabled = !matches!(command.arguments.first(), Some(AmfValue::Boolean(false)));
                if let Some(stream) = self.streams.get_mut(&stream_id) {
                    stream.receive_audio = enabled;
                }
                events.push(RtmpEvent::ReceiveAudioChanged { stream_id, enabled });
            }
            "receiveVideo" => {
                let enabled = !matches!(command.arguments.first(), Some(AmfValue::Boolean(false)));
                if let Some(stream) = self.streams.get_mut(&stream_id) {
                    stream.receive_video = enabled;
                }
                events.push(RtmpEvent::ReceiveVideoChanged { stream_id, enabled });
            }
            "deleteStream" | "closeStream" => {
                if let Some(stream) = self.streams.get_mut(&stream_id) {
                    stream.state = NetStreamState::Destroyed;
                }
            }
            other => {
                self.logger.debug(&format!("unhandled command '{}'", other));
            }
        }
        Ok(())
    }

    fn send_window_control(&mut self) {
        let window = message::encode_window_ack_size(self.window_ack_size);
        self.outbound.extend(encode_message(2, &window, self.max_chunk_size as usize));

        let bandwidth = message::encode_set_peer_bandwidth(self.window_ack_size, message::LimitType::Dynamic);
        self.outbound.extend(encode_message(2, &bandwidth, self.max_chunk_size as usize));

        let chunk_size = message::encode_set_chunk_size(self.max_chunk_size);
        self.outbound.extend(encode_message(2, &chunk_size, self.max_chunk_size as usize));
    }

    fn send_connect_result(&mut self, transaction_id: f64) {
        let mut properties = std::collections::HashMap::new();
        properties.insert("fmsVer".to_string(), AmfValue::String("FMS/3,5,7,7009".to_string()));
        properties.insert("capabilities".to_string(), AmfValue::Number(31.0));

        let mut information = std::collections::HashMap::new();
        information.insert("level".to_string(), AmfValue::String("status".to_string()));
        information.insert("code".to_string(), AmfValue::String("NetConnection.Connect.Success".to_string()));
        information.insert("description".to_string(), AmfValue::String("Connection succeeded.".to_string()));

        let result = CommandMessage::new("_result", transaction_id, AmfValue::Object(properties))
            .with_arguments(vec![AmfValue::Object(information)]);
        let encoded = result.encode();
        self.outbound.extend(encode_message(3, &encoded, self.max_chunk_size as usize));
    }

    /// Sends `_error` with `NetConnection.Connect.Rejected` for a `connect`
    /// whose application name has no registered handler. The caller
    /// disconnects right after: this only gives the peer a chance to learn
    /// why before the socket closes.
    fn send_connect_rejected(&mut self, transaction_id: f64) {
        let mut information = std::collections::HashMap::new();
        information.insert("level".to_string(), AmfValue::String("error".to_string()));
        information.insert(
            "code".to_string(),
            AmfValue::String("NetConnection.Connect.Rejected".to_string()),
        );
        information.insert(
            "description".to_string(),
            AmfValue::String("Connection rejected: no application registered.".to_string()),
        );

        let error = CommandMessage::new("_error", transaction_id, AmfValue::Null)
            .with_arguments(vec![AmfValue::Object(information)]);
        let encoded = error.encode();
        self.outbound.extend(encode_message(3, &encoded, self.max_chunk_size as usize));
    }

    fn send_create_stream_result(&mut self, transaction_id: f64, new_stream_id: f64) {
        let result = CommandMessage::new("_result", transaction_id, AmfValue::Null)
            .with_arguments(vec![AmfValue::Number(new_stream_id)]);
        let encoded = result.encode();
        self.outbound.extend(encode_message(3, &encoded, self.max_chunk_size as usize));
    }

    pub fn close(&mut self) -> ExitCode {
        self.state = ConnectionState::Closed;
        ExitCode::Disconnected
    }

    #[allow(dead_code)]
    fn next_transaction_id(&mut self) -> f64 {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1.0;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::LogLevel;
    use tempfile::tempdir;

    fn test_logger() -> Logger {
        let dir = tempdir().unwrap();
        Logger::new(dir.path().join("test.log"), LogLevel::Debug).unwrap()
    }

    #[test]
    fn simple_handshake_transitions_to_chunk_stream() {
        let mut connection = RtmpConnection::new(128, 2_500_000, test_logger());
        connection.register_application("live");

        let c0 = vec![handshake::HANDSHAKE_VERSION];
        let c1 = [0u8; C1_SIZE];
        let events = connection.feed(&c0).unwrap();
        assert!(events.is_empty());
        assert_eq!(connection.state(), ConnectionState::HeaderC1Wait);

        connection.feed(&c1).unwrap();
        assert_eq!(connection.state(), ConnectionState::HeaderC2Wait);
        let outbound = connection.take_outbound();
        assert_eq!(outbound.len(), 1 + C1_SIZE * 2);

        let c2 = [0u8; C1_SIZE];
        connection.feed(&c2).unwrap();
        assert_eq!(connection.state(), ConnectionState::ChunkStreamActive);
    }

    #[test]
    fn connect_command_is_rejected_for_unregistered_application() {
        let mut connection = RtmpConnection::new(128, 2_500_000, test_logger());
        connection.register_application("live");

        connection.feed(&[handshake::HANDSHAKE_VERSION]).unwrap();
        connection.feed(&[0u8; C1_SIZE]).unwrap();
        connection.feed(&[0u8; C1_SIZE]).unwrap();
        connection.take_outbound();

        let connect = CommandMessage::new("connect", 1.0, {
            let mut obj = std::collections::HashMap::new();
            obj.insert("app".to_string(), AmfValue::String("vod".to_string()));
            AmfValue::Object(obj)
        });
        let message = connect.encode();
        let encoded = crate::chunk::encode_message(3, &message, 128);

        assert!(connection.feed(&encoded).is_err());
        let outbound = connection.take_outbound();
        assert!(!outbound.is_empty(), "a `_error` reply should be queued before disconnect");
    }

    #[test]
    fn connect_and_publish_produce_expected_events() {
        let mut connection = RtmpConnection::new(128, 2_500_000, test_logger());
        connection.register_application("live");

        connection.feed(&[handshake::HANDSHAKE_VERSION]).unwrap();
        connection.feed(&[0u8; C1_SIZE]).unwrap();
        connection.feed(&[0u8; C1_SIZE]).unwrap();
        connection.take_outbound();

        let connect = CommandMessage::new("connect", 1.0, {
            let mut obj = std::collections::HashMap::new();
            obj.insert("app".to_string(), AmfValue::String("live".to_string()));
            AmfValue::Object(obj)
        });
        let encoded = crate::chunk::encode_message(3, &connect.encode(), 128);
        let events = connection.feed(&encoded).unwrap();
        assert!(matches!(events[0], RtmpEvent::Connected { .. }));

        let publish = CommandMessage::new("publish", 3.0, AmfValue::Null)
            .with_arguments(vec![AmfValue::String("mystream".to_string())]);
        let message = publish.encode();
        let mut raw = RtmpMessage::control(message.message_type_id, message.body);
        raw.message_stream_id = 1;
        let encoded = crate::chunk::encode_message(8, &raw, 128);
        let events = connection.feed(&encoded).unwrap();
        assert!(matches!(&events[0], RtmpEvent::PublishStarted { stream_name, .. } if stream_name == "mystream"));
    }

    #[test]
    fn pause_and_receive_flags_update_the_net_stream() {
        let mut connection = RtmpConnection::new(128, 2_500_000, test_logger());
        connection.register_application("live");

        connection.feed(&[handshake::HANDSHAKE_VERSION]).unwrap();
        connection.feed(&[0u8; C1_SIZE]).unwrap();
        connection.feed(&[0u8; C1_SIZE]).unwrap();
        connection.take_outbound();

        let connect = CommandMessage::new("connect", 1.0, {
            let mut obj = std::collections::HashMap::new();
            obj.insert("app".to_string(), AmfValue::String("live".to_string()));
            AmfValue::Object(obj)
        });
        let encoded = crate::chunk::encode_message(3, &connect.encode(), 128);
        connection.feed(&encoded).unwrap();

        let play = CommandMessage::new("play", 2.0, AmfValue::Null)
            .with_arguments(vec![AmfValue::String("mystream".to_string())]);
        let mut raw = RtmpMessage::control(play.encode().message_type_id, play.encode().body);
        raw.message_stream_id = 1;
        let encoded = crate::chunk::encode_message(8, &raw, 128);
        connection.feed(&encoded).unwrap();

        let pause = CommandMessage::new("pause", 3.0, AmfValue::Null)
            .with_arguments(vec![AmfValue::Boolean(true)]);
        let mut raw = RtmpMessage::control(pause.encode().message_type_id, pause.encode().body);
        raw.message_stream_id = 1;
        let encoded = crate::chunk::encode_message(8, &raw, 128);
        let events = connection.feed(&encoded).unwrap();
        assert!(matches!(events[0], RtmpEvent::PauseChanged { paused: true, .. }));
        assert_eq!(connection.streams.get(&1).unwrap().state, NetStreamState::Paused);

        let receive_audio = CommandMessage::new("receiveAudio", 4.0, AmfValue::Null)
            .with_arguments(vec![AmfValue::Boolean(false)]);
        let mut raw = RtmpMessage::control(receive_audio.encode().message_type_id, receive_audio.encode().body);
        raw.message_stream_id = 1;
        let encoded = crate::chunk::encode_message(8, &raw, 128);
        let events = connection.feed(&encoded).unwrap();
        assert!(matches!(events[0], RtmpEvent::ReceiveAudioChanged { enabled: false, .. }));
        assert!(!connection.streams.get(&1).unwrap().receive_audio);
    }
}
