//! The command unmarshaller: reads one [`Frame`] and constructs the
//! corresponding inbound command.

use crate::command::{BrokerError, ConsumerId, Message, MessageKind};
use crate::destination::Destination;
use crate::error::{Result, StompError};
use crate::frame::Frame;
use crate::header;
use crate::session::{ExceptionResponse, InboundCommand, MessageDispatch, Response, SessionState, WireFormatInfo};

/// Every reserved header MESSAGE maps into a typed field, plus the
/// housekeeping headers that are always stripped before the rest are
/// copied onto `Message::headers`.
const MESSAGE_RESERVED_HEADERS: &[&str] = &[
    "transformation",
    "receipt",
    "content-length",
    "type",
    "destination",
    "reply-to",
    "subscription",
    "correlation-id",
    "message-id",
    "persistent",
    "NMSXDeliveryMode",
    "priority",
    "timestamp",
    "expires",
    "redelivered",
    "JMSXGroupID",
    "NMSXGroupID",
    "JMSXGroupSeq",
    "NMSXGroupSeq",
];

/// Outcome of unmarshalling a single frame, before the session applies
/// any resulting state transition or transport delivery.
pub(crate) enum UnmarshalOutcome {
    Command(InboundCommand),
    /// The session must deliver `Response` to the transport callback
    /// in addition to returning `InboundCommand` to its own caller --
    /// only CONNECTED does this.
    CommandWithCallback(InboundCommand, Response),
    /// Unrecognized verb; logged by the caller, never surfaced as an
    /// error.
    Unknown(String),
}

pub(crate) fn from_frame(frame: Frame, state: &mut SessionState) -> Result<UnmarshalOutcome> {
    let headers = header::decode_map(&frame.headers, state.encode_headers)?;

    match frame.command.as_str() {
        "CONNECTED" => connected(&headers, state),
        "RECEIPT" => receipt(&headers),
        "ERROR" => error(&headers),
        "MESSAGE" => message(&headers, &frame.body),
        other => Ok(UnmarshalOutcome::Unknown(other.to_owned())),
    }
}

fn connected(
    headers: &header::HeaderMap,
    state: &mut SessionState,
) -> Result<UnmarshalOutcome> {
    let info = match headers.get("version") {
        Some(raw) => {
            let version: f64 = raw
                .parse()
                .map_err(|_| StompError::MalformedFrame(format!("bad CONNECTED version: {raw}")))?;
            if version > 1.0 {
                state.encode_headers = true;
            }
            let session = headers.get("session").map(str::to_owned);
            let (write_check_interval, read_check_interval) = match headers.get("heart-beat") {
                Some(raw) => parse_heartbeat(raw)?,
                None => (0, 0),
            };
            WireFormatInfo {
                version,
                session,
                read_check_interval,
                write_check_interval,
            }
        }
        None => WireFormatInfo {
            version: 1.0,
            session: None,
            read_check_interval: 0,
            write_check_interval: 0,
        },
    };
    state.remote_wire_info = Some(info.clone());

    match state.pending_connect_correlation.take() {
        Some(correlation_id) => Ok(UnmarshalOutcome::CommandWithCallback(
            InboundCommand::WireFormatInfo(info),
            Response { correlation_id },
        )),
        None => Err(StompError::ProtocolError(
            "CONNECTED received without a pending CONNECT".into(),
        )),
    }
}

fn parse_heartbeat(raw: &str) -> Result<(u32, u32)> {
    let mut parts = raw.splitn(2, ',');
    let (Some(write), Some(read)) = (parts.next(), parts.next()) else {
        return Err(StompError::MalformedFrame(format!(
            "bad heart-beat header: {raw}"
        )));
    };
    let write = write
        .trim()
        .parse()
        .map_err(|_| StompError::MalformedFrame(format!("bad heart-beat header: {raw}")))?;
    let read = read
        .trim()
        .parse()
        .map_err(|_| StompError::MalformedFrame(format!("bad heart-beat header: {raw}")))?;
    Ok((write, read))
}

fn receipt(headers: &header::HeaderMap) -> Result<UnmarshalOutcome> {
    let Some(raw) = headers.get("receipt-id") else {
        return Ok(UnmarshalOutcome::Unknown("RECEIPT".into()));
    };
    // `ignore:`-prefixed or not, the remainder is always parsed as the
    // correlation id.
    let id_str = raw.strip_prefix("ignore:").unwrap_or(raw);
    let correlation_id = id_str
        .parse()
        .map_err(|_| StompError::MalformedFrame(format!("bad receipt-id: {raw}")))?;
    Ok(UnmarshalOutcome::Command(InboundCommand::Response(
        Response { correlation_id },
    )))
}

fn error(headers: &header::HeaderMap) -> Result<UnmarshalOutcome> {
    if let Some(raw) = headers.get("receipt-id") {
        if let Some(rest) = raw.strip_prefix("ignore:") {
            let correlation_id = rest
                .parse()
                .map_err(|_| StompError::MalformedFrame(format!("bad receipt-id: {raw}")))?;
            return Ok(UnmarshalOutcome::Command(InboundCommand::Response(
                Response { correlation_id },
            )));
        }
    }
    let correlation_id = headers
        .get("receipt-id")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);
    let message = headers.get("message").map(str::to_owned);
    Ok(UnmarshalOutcome::Command(InboundCommand::ExceptionResponse(
        ExceptionResponse {
            correlation_id,
            exception: BrokerError { message },
        },
    )))
}

fn message(headers: &header::HeaderMap, body: &bytes::Bytes) -> Result<UnmarshalOutcome> {
    let is_binary = headers.contains("content-length");

    let destination = headers
        .get("destination")
        .and_then(Destination::from_wire_str)
        .ok_or_else(|| StompError::MalformedFrame("MESSAGE frame missing destination".into()))?;
    let reply_to = headers.get("reply-to").and_then(Destination::from_wire_str);
    let consumer_id = headers.get("subscription").map(|s| ConsumerId(s.to_owned()));
    let correlation_id = headers.get("correlation-id").map(str::to_owned);
    let message_id = headers.get("message-id").map(str::to_owned);
    let message_type = headers.get("type").map(str::to_owned);

    let mut persistent = headers
        .get("persistent")
        .map(|v| v == "true")
        .unwrap_or(false);
    if let Some(v) = headers.get("NMSXDeliveryMode") {
        persistent = v == "true";
    }

    let priority = match headers.get("priority") {
        Some(raw) => raw
            .parse()
            .map_err(|_| StompError::MalformedFrame(format!("bad priority: {raw}")))?,
        None => 4,
    };
    let timestamp = match headers.get("timestamp") {
        Some(raw) => raw
            .parse()
            .map_err(|_| StompError::MalformedFrame(format!("bad timestamp: {raw}")))?,
        None => 0,
    };
    let expiration = match headers.get("expires") {
        Some(raw) => raw
            .parse()
            .map_err(|_| StompError::MalformedFrame(format!("bad expires: {raw}")))?,
        None => 0,
    };
    let redelivery_counter = if headers.contains("redelivered") { 1 } else { 0 };

    let mut group_id = headers.get("JMSXGroupID").map(str::to_owned);
    if let Some(v) = headers.get("NMSXGroupID") {
        group_id = Some(v.to_owned());
    }
    let mut group_seq = match headers.get("JMSXGroupSeq") {
        Some(raw) => raw
            .parse()
            .map_err(|_| StompError::MalformedFrame(format!("bad JMSXGroupSeq: {raw}")))?,
        None => 0,
    };
    if let Some(raw) = headers.get("NMSXGroupSeq") {
        group_seq = raw
            .parse()
            .map_err(|_| StompError::MalformedFrame(format!("bad NMSXGroupSeq: {raw}")))?;
    }

    let kind = if is_binary {
        MessageKind::Bytes
    } else {
        MessageKind::Text
    };
    if !is_binary {
        std::str::from_utf8(body)
            .map_err(|e| StompError::MalformedFrame(format!("non-UTF-8 text message body: {e}")))?;
    }

    let user_headers = headers
        .iter()
        .filter(|(name, _)| !MESSAGE_RESERVED_HEADERS.contains(name))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

    let msg = Message {
        destination: destination.clone(),
        reply_to,
        message_id,
        correlation_id,
        expiration,
        timestamp,
        priority,
        message_type,
        transaction_id: None,
        persistent,
        group_id,
        group_seq,
        kind,
        content: body.clone(),
        headers: user_headers,
        command_id: 0,
        response_required: false,
    };

    Ok(UnmarshalOutcome::Command(InboundCommand::MessageDispatch(
        MessageDispatch {
            consumer_id,
            destination,
            message: msg,
            redelivery_counter,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ParsedFrame;

    fn parse_and_unmarshal(data: &[u8], state: &mut SessionState) -> UnmarshalOutcome {
        let (parsed, _) = Frame::parse(data).unwrap().unwrap();
        let frame = match parsed {
            ParsedFrame::Frame(f) => f,
            ParsedFrame::KeepAlive => panic!("expected a frame"),
        };
        from_frame(frame, state).unwrap()
    }

    #[test]
    fn s4_message_binary_via_content_length() {
        let data = b"MESSAGE\ndestination:/queue/Q\nmessage-id:m1\nsubscription:c1\ncontent-length:3\n\nABC\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::MessageDispatch(dispatch)) => {
                assert_eq!(dispatch.consumer_id, Some(ConsumerId("c1".into())));
                assert_eq!(dispatch.message.kind, MessageKind::Bytes);
                assert_eq!(&dispatch.message.content[..], b"ABC");
                assert_eq!(dispatch.message.message_id.as_deref(), Some("m1"));
            }
            _ => panic!("expected a message dispatch"),
        }
    }

    #[test]
    fn message_text_without_content_length() {
        let data = b"MESSAGE\ndestination:/topic/T\nmessage-id:m2\nsubscription:c2\n\nhello\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::MessageDispatch(dispatch)) => {
                assert_eq!(dispatch.message.kind, MessageKind::Text);
                assert_eq!(&dispatch.message.content[..], b"hello");
            }
            _ => panic!("expected a message dispatch"),
        }
    }

    #[test]
    fn message_nmsx_delivery_mode_overrides_persistent() {
        let data = b"MESSAGE\ndestination:/queue/Q\nmessage-id:m\nsubscription:c\npersistent:false\nNMSXDeliveryMode:true\n\nbody\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::MessageDispatch(dispatch)) => {
                assert!(dispatch.message.persistent);
            }
            _ => panic!("expected a message dispatch"),
        }
    }

    #[test]
    fn message_redelivered_header_sets_counter() {
        let data = b"MESSAGE\ndestination:/queue/Q\nmessage-id:m\nsubscription:c\nredelivered:true\n\nbody\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::MessageDispatch(dispatch)) => {
                assert_eq!(dispatch.redelivery_counter, 1);
            }
            _ => panic!("expected a message dispatch"),
        }
    }

    #[test]
    fn message_group_headers_map_to_typed_fields_not_user_headers() {
        let data = b"MESSAGE\ndestination:/queue/Q\nmessage-id:m\nsubscription:c\nJMSXGroupID:group-a\nNMSXGroupID:group-a\nJMSXGroupSeq:3\nNMSXGroupSeq:3\n\nbody\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::MessageDispatch(dispatch)) => {
                assert_eq!(dispatch.message.group_id.as_deref(), Some("group-a"));
                assert_eq!(dispatch.message.group_seq, 3);
                assert!(dispatch.message.headers.is_empty());
            }
            _ => panic!("expected a message dispatch"),
        }
    }

    #[test]
    fn message_extra_headers_become_user_headers() {
        let data = b"MESSAGE\ndestination:/queue/Q\nmessage-id:m\nsubscription:c\nmy-header:value\n\nbody\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::MessageDispatch(dispatch)) => {
                assert_eq!(
                    dispatch.message.headers,
                    vec![("my-header".to_string(), "value".to_string())]
                );
            }
            _ => panic!("expected a message dispatch"),
        }
    }

    #[test]
    fn s5_receipt_ignore_prefix_is_stripped() {
        let data = b"RECEIPT\nreceipt-id:ignore:42\n\n\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::Response(r)) => {
                assert_eq!(r.correlation_id, 42)
            }
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn receipt_without_prefix() {
        let data = b"RECEIPT\nreceipt-id:7\n\n\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::Command(InboundCommand::Response(r)) => assert_eq!(r.correlation_id, 7),
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn receipt_without_receipt_id_is_unknown() {
        let data = b"RECEIPT\n\n\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        assert!(matches!(outcome, UnmarshalOutcome::Unknown(_)));
    }

    #[test]
    fn connected_without_version_defaults_to_1_0() {
        let data = b"CONNECTED\n\n\x00";
        let mut state = SessionState::default();
        state.pending_connect_correlation = Some(1);
        let outcome = parse_and_unmarshal(data, &mut state);
        match outcome {
            UnmarshalOutcome::CommandWithCallback(InboundCommand::WireFormatInfo(info), resp) => {
                assert_eq!(info.version, 1.0);
                assert_eq!(resp.correlation_id, 1);
            }
            _ => panic!("expected WireFormatInfo with callback"),
        }
        assert!(!state.encode_headers);
    }

    #[test]
    fn unknown_verb_is_reported_as_unknown() {
        let data = b"BOGUS\n\n\x00";
        let mut state = SessionState::default();
        let outcome = parse_and_unmarshal(data, &mut state);
        assert!(matches!(outcome, UnmarshalOutcome::Unknown(_)));
    }
}
