//! The command marshaller: one `Frame` construction per outbound
//! [`Command`] variant.

use bytes::Bytes;

use crate::command::{Command, MessageKind, ObjectId, TransactionKind};
use crate::frame::Frame;
use crate::header::HeaderMap;
use crate::session::{Response, SessionState, WireFormatConfig};

/// What a marshalled command turns into: a frame to write, the
/// keep-alive sentinel, a command synthesized straight to the
/// transport callback (no bytes written), or nothing at all.
pub(crate) enum MarshalOutcome {
    Frame(Frame),
    KeepAlive,
    Synthesized(Response),
    Dropped,
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// `write_check_interval,read_check_interval` for the CONNECT
/// `heart-beat` header, computed from a connection's own requested
/// `max_inactivity_duration` (not the session's already-negotiated
/// config, since CONNECT is what proposes these values in the first
/// place).
fn heart_beat_header(max_inactivity_duration: u32) -> String {
    let config = WireFormatConfig {
        max_inactivity_duration,
        max_inactivity_initial_delay: 0,
    };
    format!(
        "{},{}",
        config.write_check_interval(),
        config.read_check_interval()
    )
}

pub(crate) fn to_frame(
    command: &Command,
    state: &mut SessionState,
    _config: &WireFormatConfig,
) -> crate::error::Result<MarshalOutcome> {
    use crate::error::StompError;

    let frame = match command {
        Command::Connection(info) => {
            let mut headers = HeaderMap::new();
            headers.set("client-id", info.client_id.clone());
            if let Some(login) = &info.user_name {
                if !login.is_empty() {
                    headers.set("login", login.clone());
                }
            }
            if let Some(passcode) = &info.password {
                if !passcode.is_empty() {
                    headers.set("passcode", passcode.clone());
                }
            }
            headers.set("host", info.host.clone());
            headers.set("accept-version", "1.0,1.1");
            if info.max_inactivity_duration != 0 {
                headers.set("heart-beat", heart_beat_header(info.max_inactivity_duration));
            }
            state.pending_connect_correlation = Some(info.command_id);
            Frame::new("CONNECT", headers, Bytes::new())
        }

        Command::Message(m) => {
            let mut headers = HeaderMap::new();
            if m.response_required {
                headers.set("receipt", m.command_id.to_string());
            }
            headers.set("destination", m.destination.to_wire_string());
            if let Some(reply_to) = &m.reply_to {
                headers.set("reply-to", reply_to.to_wire_string());
            }
            if let Some(cid) = &m.correlation_id {
                headers.set("correlation-id", cid.clone());
            }
            if m.expiration != 0 {
                headers.set("expires", m.expiration.to_string());
            }
            if m.timestamp != 0 {
                headers.set("timestamp", m.timestamp.to_string());
            }
            if m.priority != 4 {
                headers.set("priority", m.priority.to_string());
            }
            if let Some(t) = &m.message_type {
                headers.set("type", t.clone());
            }
            if let Some(tx) = &m.transaction_id {
                headers.set("transaction", tx.0.clone());
            }
            headers.set("persistent", bool_str(m.persistent));
            headers.set("NMSXDeliveryMode", bool_str(m.persistent));
            if let Some(group_id) = &m.group_id {
                headers.set("JMSXGroupID", group_id.clone());
                headers.set("NMSXGroupID", group_id.clone());
                headers.set("JMSXGroupSeq", m.group_seq.to_string());
                headers.set("NMSXGroupSeq", m.group_seq.to_string());
            }
            if m.kind == MessageKind::Bytes && !m.content.is_empty() {
                headers.set("content-length", m.content.len().to_string());
                headers.set("transformation", "jms-byte");
            }
            // User headers are added last and never override a
            // reserved name already set above.
            for (name, value) in &m.headers {
                headers.push_first_wins(name.clone(), value.clone());
            }
            Frame::new("SEND", headers, m.content.clone())
        }

        Command::Consumer(c) => {
            let mut headers = HeaderMap::new();
            if c.response_required {
                headers.set("receipt", c.command_id.to_string());
            }
            headers.set("destination", c.destination.to_wire_string());
            headers.set("id", c.consumer_id.0.clone());
            if let Some(name) = &c.subscription_name {
                headers.set("durable-subscriber-name", name.clone());
            }
            if let Some(selector) = &c.selector {
                headers.set("selector", selector.clone());
            }
            headers.set("ack", c.ack_mode.as_wire_str());
            if c.no_local {
                // Broker expects the capitalized form here; every other
                // boolean header on the wire uses lowercase.
                headers.set("no-local", "True");
            }
            headers.set(
                "transformation",
                c.transformation.clone().unwrap_or_else(|| "jms-xml".into()),
            );
            headers.set("activemq.dispatchAsync", bool_str(c.dispatch_async));
            if c.exclusive {
                headers.set("activemq.exclusive", "true");
            }
            if let Some(name) = &c.subscription_name {
                headers.set("activemq.subscriptionName", name.clone());
                // Legacy misspelling, kept intentionally for broker
                // compatibility with older consumers.
                headers.set("activemq.subcriptionName", name.clone());
            }
            headers.set(
                "activemq.maximumPendingMessageLimit",
                c.maximum_pending_message_limit.to_string(),
            );
            headers.set("activemq.prefetchSize", c.prefetch_size.to_string());
            headers.set("activemq.priority", c.priority.to_string());
            if c.retroactive {
                headers.set("activemq.retroactive", "true");
            }
            Frame::new("SUBSCRIBE", headers, Bytes::new())
        }

        Command::Remove(r) => {
            let consumer_id = match &r.object_id {
                ObjectId::Consumer(id) => id,
                ObjectId::Other(_) => return Ok(MarshalOutcome::Dropped),
            };
            let mut headers = HeaderMap::new();
            if r.response_required {
                headers.set("receipt", r.command_id.to_string());
            }
            headers.set("id", consumer_id.0.clone());
            Frame::new("UNSUBSCRIBE", headers, Bytes::new())
        }

        Command::Ack(a) => {
            let mut headers = HeaderMap::new();
            headers.set("message-id", a.last_message_id.clone());
            headers.set("subscription", a.consumer_id.0.clone());
            if let Some(tx) = &a.transaction_id {
                headers.set("transaction", tx.0.clone());
            }
            if a.response_required {
                headers.set("receipt", format!("ignore:{}", a.command_id));
            }
            Frame::new("ACK", headers, Bytes::new())
        }

        Command::Transaction(t) => {
            let verb = match t.kind {
                TransactionKind::Begin => "BEGIN",
                TransactionKind::Commit => "COMMIT",
                TransactionKind::Rollback => "ABORT",
            };
            let response_required = match t.kind {
                TransactionKind::Begin => t.response_required,
                TransactionKind::Commit | TransactionKind::Rollback => true,
            };
            let mut headers = HeaderMap::new();
            if response_required {
                headers.set("receipt", t.command_id.to_string());
            }
            headers.set("transaction", t.transaction_id.0.clone());
            Frame::new(verb, headers, Bytes::new())
        }

        Command::Shutdown(s) => {
            if s.response_required {
                return Err(StompError::ProtocolError(
                    "DISCONNECT must not request a response".into(),
                ));
            }
            Frame::new("DISCONNECT", HeaderMap::new(), Bytes::new())
        }

        Command::KeepAlive(_) => return Ok(MarshalOutcome::KeepAlive),

        Command::Generic(g) => {
            return if g.response_required {
                Ok(MarshalOutcome::Synthesized(Response {
                    correlation_id: g.command_id,
                }))
            } else {
                Ok(MarshalOutcome::Dropped)
            };
        }
    };

    Ok(MarshalOutcome::Frame(frame))
}
