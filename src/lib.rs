//! stomp-wire - a STOMP 1.0/1.1 wire-format codec for ActiveMQ-compatible
//! brokers.
//!
//! This crate owns the frame grammar, header escaping, destination
//! encoding and the marshal/unmarshal translation between the wire and
//! a typed command object model. It does not own connection
//! establishment, reconnection or message dispatch to consumer
//! threads -- those live one layer up, in whatever binds
//! [`session::WireFormat`] to a real transport.

mod codec;
mod command;
mod destination;
mod error;
mod frame;
mod header;
mod marshal;
mod session;
mod unmarshal;

pub use codec::StompCodec;
pub use command::{
    AckMode, BrokerError, Command, ConnectionInfo, ConsumerId, ConsumerInfo, GenericCommand,
    KeepAliveInfo, Message, MessageAck, MessageKind, ObjectId, RemoveInfo, ShutdownInfo,
    TransactionId, TransactionInfo, TransactionKind,
};
pub use destination::{Destination, DestinationKind};
pub use error::{Result, StompError};
pub use frame::{Frame, ParsedFrame};
pub use header::HeaderMap;
pub use session::{
    ConnectionState, ExceptionResponse, InboundCommand, MessageDispatch, Response, Transport,
    WireFormat, WireFormatConfig, WireFormatInfo,
};
