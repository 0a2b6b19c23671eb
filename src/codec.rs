//! `tokio_util::codec::{Decoder, Encoder}` adapter binding the codec to
//! a `Framed<TcpStream, _>` transport.
//!
//! This is transport glue, not the component's contract: the
//! authoritative `marshal`/`unmarshal` pair lives on
//! [`crate::session::WireFormat`], which is the actual public
//! contract. `StompCodec` exists so the codec can be exercised
//! end-to-end against a real async transport in tests.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::command::{Command, KeepAliveInfo};
use crate::error::StompError;
use crate::frame::{Frame, ParsedFrame};
use crate::marshal;
use crate::session::{InboundCommand, SessionState, WireFormatConfig};
use crate::unmarshal::{self, UnmarshalOutcome};

/// Decoder/encoder pair over a single STOMP connection's bytes.
///
/// Unlike [`crate::session::WireFormat`], which delivers a synthesized
/// `Response` to its `Transport` callback strictly before the
/// triggering `unmarshal` call returns, `StompCodec` has no callback
/// slot to inject into -- `tokio_util::codec::Decoder::decode` returns
/// one item at a time. A synthesized `Response` (from CONNECTED) is
/// queued and surfaced on the *next* `decode` call instead. Callers
/// that need the strict same-call ordering should drive
/// [`crate::session::WireFormat`] directly.
#[derive(Debug, Default)]
pub struct StompCodec {
    state: SessionState,
    pending: VecDeque<InboundCommand>,
}

impl StompCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(_config: WireFormatConfig) -> Self {
        // `WireFormatConfig` only affects what a CONNECT command
        // carries (computed by the caller before it is marshalled);
        // the codec itself only needs the negotiated `encode_headers`
        // flag, tracked in `SessionState`.
        Self::new()
    }
}

impl Decoder for StompCodec {
    type Item = InboundCommand;
    type Error = StompError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(command) = self.pending.pop_front() {
            return Ok(Some(command));
        }

        loop {
            match Frame::parse(src)? {
                None => return Ok(None),
                Some((ParsedFrame::KeepAlive, consumed)) => {
                    src.advance(consumed);
                    return Ok(Some(InboundCommand::KeepAlive(KeepAliveInfo)));
                }
                Some((ParsedFrame::Frame(frame), consumed)) => {
                    src.advance(consumed);
                    match unmarshal::from_frame(frame, &mut self.state)? {
                        UnmarshalOutcome::Command(command) => return Ok(Some(command)),
                        UnmarshalOutcome::CommandWithCallback(command, response) => {
                            self.pending.push_back(InboundCommand::Response(response));
                            return Ok(Some(command));
                        }
                        UnmarshalOutcome::Unknown(verb) => {
                            tracing::warn!(verb = %verb, "unrecognized STOMP frame verb");
                            continue;
                        }
                    }
                }
            }
        }
    }
}

impl Encoder<Command> for StompCodec {
    type Error = StompError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if matches!(item, Command::Connection(_)) && self.state.pending_connect_correlation.is_some()
        {
            return Err(StompError::ProtocolError(
                "CONNECT already pending on this session".into(),
            ));
        }

        match marshal::to_frame(&item, &mut self.state, &WireFormatConfig::default())? {
            marshal::MarshalOutcome::Frame(frame) => {
                frame.write(self.state.encode_headers, dst);
            }
            marshal::MarshalOutcome::KeepAlive => {
                Frame::write_keepalive(dst);
            }
            marshal::MarshalOutcome::Synthesized(response) => {
                self.pending.push_back(InboundCommand::Response(response));
            }
            marshal::MarshalOutcome::Dropped => {
                tracing::warn!("command has no STOMP frame mapping and was dropped");
            }
        }
        Ok(())
    }
}
