//! The wire-format session: per-connection state plus the
//! `marshal`/`unmarshal` public contract.

use std::io::{Read, Write};

use bytes::BytesMut;

use crate::command::{BrokerError, Command, ConsumerId, KeepAliveInfo, Message};
use crate::destination::Destination;
use crate::error::{Result, StompError};
use crate::frame::{Frame, ParsedFrame};
use crate::{marshal, unmarshal};

/// The reconstructed view of a CONNECTED frame: negotiated version,
/// session id, heart-beat intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct WireFormatInfo {
    pub version: f64,
    pub session: Option<String>,
    pub read_check_interval: u32,
    pub write_check_interval: u32,
}

/// The envelope delivered to the consumer subsystem for an inbound
/// MESSAGE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDispatch {
    pub consumer_id: Option<ConsumerId>,
    pub destination: Destination,
    pub message: Message,
    pub redelivery_counter: u32,
}

/// Broker acknowledgement of a client frame, correlated by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub correlation_id: i32,
}

/// A broker-reported failure that did not arrive as an ignore-prefixed
/// receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub correlation_id: i32,
    pub exception: BrokerError,
}

/// Everything the unmarshaller can produce, whether returned directly
/// from [`WireFormat::unmarshal`] or delivered to the [`Transport`]
/// callback as a synthesized command.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundCommand {
    Response(Response),
    ExceptionResponse(ExceptionResponse),
    WireFormatInfo(WireFormatInfo),
    MessageDispatch(MessageDispatch),
    KeepAlive(KeepAliveInfo),
}

/// Weak collaborator the session hands synthesized commands to. The
/// session does not own the transport's lifetime; a missing transport
/// is tolerated, not an error.
pub trait Transport {
    fn command(&self, command: InboundCommand);
}

/// Tunable wire-format constants negotiated at CONNECT time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFormatConfig {
    pub max_inactivity_duration: u32,
    pub max_inactivity_initial_delay: u32,
}

impl Default for WireFormatConfig {
    fn default() -> Self {
        Self {
            max_inactivity_duration: 30_000,
            max_inactivity_initial_delay: 0,
        }
    }
}

impl WireFormatConfig {
    /// `read_check_interval = max_inactivity_duration`.
    pub fn read_check_interval(&self) -> u32 {
        self.max_inactivity_duration
    }

    /// `write_check_interval = max_inactivity_duration / 3`, minimum 1
    /// when `max_inactivity_duration > 0`, else equal to it.
    pub fn write_check_interval(&self) -> u32 {
        if self.max_inactivity_duration == 0 {
            0
        } else {
            (self.max_inactivity_duration / 3).max(1)
        }
    }
}

/// Mutable per-connection state shared by the marshaller and
/// unmarshaller.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub encode_headers: bool,
    pub pending_connect_correlation: Option<i32>,
    pub remote_wire_info: Option<WireFormatInfo>,
}

/// The connection's negotiation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Fresh,
    ConnectPending,
    Connected,
    Disconnected,
}

/// Binds the marshaller and unmarshaller to a single connection,
/// tracking negotiated version, header-encoding mode, heart-beats and
/// the pending CONNECT correlation id.
///
/// `marshal`/`unmarshal` MUST NOT be invoked concurrently for the same
/// session -- this is a caller contract; `WireFormat` performs no
/// internal locking.
pub struct WireFormat<T> {
    pub(crate) state: SessionState,
    config: WireFormatConfig,
    connection_state: ConnectionState,
    transport: Option<T>,
}

impl<T: Transport> WireFormat<T> {
    pub fn new(config: WireFormatConfig) -> Self {
        Self {
            state: SessionState::default(),
            config,
            connection_state: ConnectionState::Fresh,
            transport: None,
        }
    }

    /// Assign the transport callback slot. Intended to be called once
    /// at construction; nothing enforces that at the type level since
    /// the slot is plain `Option<T>` data, not a once-cell.
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &WireFormatConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn remote_wire_info(&self) -> Option<&WireFormatInfo> {
        self.state.remote_wire_info.as_ref()
    }

    /// Serialize `command` and write it to `writer`. Writes are atomic
    /// at the frame level: on any failure mid-write the buffer built
    /// in memory is simply discarded along with the session (callers
    /// should treat the session as invalidated).
    pub fn marshal<W: Write>(&mut self, command: Command, writer: &mut W) -> Result<()> {
        if matches!(command, Command::Connection(_))
            && self.state.pending_connect_correlation.is_some()
        {
            return Err(StompError::ProtocolError(
                "CONNECT already pending on this session".into(),
            ));
        }

        let outcome = marshal::to_frame(&command, &mut self.state, &self.config)?;
        match outcome {
            marshal::MarshalOutcome::Frame(frame) => {
                let mut buf = BytesMut::new();
                frame.write(self.state.encode_headers, &mut buf);
                writer.write_all(&buf)?;
                if matches!(command, Command::Connection(_)) {
                    self.connection_state = ConnectionState::ConnectPending;
                }
                if let Command::Shutdown(_) = command {
                    self.connection_state = ConnectionState::Disconnected;
                }
            }
            marshal::MarshalOutcome::KeepAlive => {
                let mut buf = BytesMut::new();
                Frame::write_keepalive(&mut buf);
                writer.write_all(&buf)?;
            }
            marshal::MarshalOutcome::Synthesized(response) => {
                self.deliver(InboundCommand::Response(response));
            }
            marshal::MarshalOutcome::Dropped => {
                tracing::warn!("command has no STOMP frame mapping and was dropped");
            }
        }
        Ok(())
    }

    /// Read one frame (or keep-alive) from `reader` and dispatch it.
    /// Returns `Ok(None)` for an unrecognized verb (logged, never
    /// surfaced as an error) and propagates transport-level read
    /// errors unchanged.
    pub fn unmarshal<R: Read>(&mut self, reader: &mut R) -> Result<Option<InboundCommand>> {
        let mut buf = Vec::new();
        loop {
            match Frame::parse(&buf)? {
                Some((ParsedFrame::KeepAlive, consumed)) => {
                    buf.drain(..consumed);
                    return Ok(Some(InboundCommand::KeepAlive(KeepAliveInfo)));
                }
                Some((ParsedFrame::Frame(frame), _consumed)) => {
                    return self.handle_frame(frame);
                }
                None => {
                    let mut byte = [0u8; 1];
                    reader.read_exact(&mut byte)?;
                    buf.push(byte[0]);
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<Option<InboundCommand>> {
        match unmarshal::from_frame(frame, &mut self.state)? {
            unmarshal::UnmarshalOutcome::Command(command) => {
                if matches!(command, InboundCommand::WireFormatInfo(_)) {
                    self.connection_state = ConnectionState::Connected;
                }
                Ok(Some(command))
            }
            unmarshal::UnmarshalOutcome::CommandWithCallback(command, response) => {
                self.deliver(InboundCommand::Response(response));
                if matches!(command, InboundCommand::WireFormatInfo(_)) {
                    self.connection_state = ConnectionState::Connected;
                }
                Ok(Some(command))
            }
            unmarshal::UnmarshalOutcome::Unknown(verb) => {
                tracing::warn!(verb = %verb, "unrecognized STOMP frame verb");
                Ok(None)
            }
        }
    }

    fn deliver(&self, command: InboundCommand) {
        match &self.transport {
            Some(t) => t.command(command),
            None => tracing::debug!("no transport wired; dropping synthesized command"),
        }
    }
}
