//! The logical command object model the marshaller consumes and the
//! unmarshaller produces.

use bytes::Bytes;

use crate::destination::Destination;

/// Opaque identifiers. Generating them is the caller's job; these are
/// plain newtypes around the textual ids the wire format carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(pub String);

/// The subset of `RemoveInfo::object_id` shapes the marshaller cares
/// about: UNSUBSCRIBE is only emitted when the object id names a
/// consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectId {
    Consumer(ConsumerId),
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    Auto,
    Client,
    ClientIndividual,
}

impl AckMode {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            AckMode::Auto => "auto",
            AckMode::Client => "client",
            AckMode::ClientIndividual => "client-individual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Begin,
    Commit,
    Rollback,
}

/// Whether a [`Message`]'s content should be framed as a binary
/// (BytesMessage) or text (TextMessage) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Bytes,
}

/// A connection handshake request (`CONNECT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client_id: String,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub command_id: i32,
    /// 0 disables heart-beat negotiation entirely.
    pub max_inactivity_duration: u32,
}

/// A superset of BytesMessage/TextMessage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub destination: Destination,
    pub reply_to: Option<Destination>,
    /// The broker-assigned message id. Always `None` on outbound
    /// messages (the broker assigns it); populated on inbound dispatch
    /// from the `message-id` header. Kept as a typed field rather than
    /// dropped into generic headers since every inbound message carries
    /// one.
    pub message_id: Option<String>,
    pub correlation_id: Option<String>,
    pub expiration: i64,
    pub timestamp: i64,
    pub priority: u8,
    pub message_type: Option<String>,
    pub transaction_id: Option<TransactionId>,
    pub persistent: bool,
    pub group_id: Option<String>,
    pub group_seq: i32,
    pub kind: MessageKind,
    pub content: Bytes,
    /// User-supplied headers not covered by a reserved field. Order is
    /// preserved for round-trip fidelity.
    pub headers: Vec<(String, String)>,
    pub command_id: i32,
    pub response_required: bool,
}

impl Message {
    pub fn priority_default() -> u8 {
        4
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerInfo {
    pub consumer_id: ConsumerId,
    pub destination: Destination,
    pub subscription_name: Option<String>,
    pub selector: Option<String>,
    pub ack_mode: AckMode,
    pub no_local: bool,
    pub dispatch_async: bool,
    pub exclusive: bool,
    pub maximum_pending_message_limit: i32,
    pub prefetch_size: i32,
    pub priority: i32,
    pub retroactive: bool,
    pub transformation: Option<String>,
    pub command_id: i32,
    pub response_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAck {
    pub consumer_id: ConsumerId,
    pub last_message_id: String,
    pub transaction_id: Option<TransactionId>,
    pub command_id: i32,
    pub response_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub command_id: i32,
    pub response_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveInfo {
    pub object_id: ObjectId,
    pub command_id: i32,
    pub response_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownInfo {
    pub response_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepAliveInfo;

/// An outbound command that doesn't map to a dedicated STOMP frame,
/// carrying only a response requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericCommand {
    pub command_id: i32,
    pub response_required: bool,
}

/// The closed set of command variants the marshaller dispatches over.
///
/// Expressed as a tagged union rather than a class hierarchy, so the
/// marshaller's match is exhaustive instead of a chain of
/// `is_instance_of` checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connection(ConnectionInfo),
    Message(Message),
    Consumer(ConsumerInfo),
    Ack(MessageAck),
    Transaction(TransactionInfo),
    Remove(RemoveInfo),
    Shutdown(ShutdownInfo),
    KeepAlive(KeepAliveInfo),
    Generic(GenericCommand),
}

impl Command {
    /// Whether the sender expects a receipt/response for this command.
    /// A plain match is enough since the variant set is closed; a
    /// trait object would add indirection with no benefit.
    pub fn response_required(&self) -> bool {
        match self {
            Command::Connection(_) => false,
            Command::Message(m) => m.response_required,
            Command::Consumer(c) => c.response_required,
            Command::Ack(a) => a.response_required,
            Command::Transaction(t) => t.response_required,
            Command::Remove(r) => r.response_required,
            Command::Shutdown(s) => s.response_required,
            Command::KeepAlive(_) => false,
            Command::Generic(g) => g.response_required,
        }
    }

    pub fn command_id(&self) -> Option<i32> {
        match self {
            Command::Connection(c) => Some(c.command_id),
            Command::Message(m) => Some(m.command_id),
            Command::Consumer(c) => Some(c.command_id),
            Command::Ack(a) => Some(a.command_id),
            Command::Transaction(t) => Some(t.command_id),
            Command::Remove(r) => Some(r.command_id),
            Command::Shutdown(_) => None,
            Command::KeepAlive(_) => None,
            Command::Generic(g) => Some(g.command_id),
        }
    }
}

/// A broker-reported failure, embedded in [`crate::session::ExceptionResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerError {
    pub message: Option<String>,
}
