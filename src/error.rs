//! Error kinds for frame parsing, header decoding and session-level
//! protocol violations.

use thiserror::Error;

/// Errors surfaced by [`crate::frame`], [`crate::header`],
/// [`crate::marshal`], [`crate::unmarshal`] and [`crate::session`].
///
/// `UnknownCommand` is never returned from [`crate::session::WireFormat::unmarshal`] --
/// per the propagation policy, an unrecognized verb is logged via
/// `tracing::warn!` and the call returns `Ok(None)` instead. The variant
/// stays part of the public enum so callers that parse a [`crate::frame::Frame`]
/// directly (bypassing the session) can still observe it.
#[derive(Debug, Error)]
pub enum StompError {
    /// A structural framing violation: a header line without a `:`, an
    /// unparseable `content-length`, or a stream that ended before the
    /// `\0` terminator.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// An invalid escape sequence (`\x` where `x` is not `\`, `n`, `r`
    /// or `c`) encountered while decoding a header under STOMP >= 1.1.
    #[error("malformed header escape sequence: {0}")]
    MalformedHeader(String),

    /// A semantic violation of the wire-format session's state machine,
    /// e.g. CONNECTED received without a pending CONNECT.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A read or write failure from the underlying transport, passed
    /// through unchanged.
    #[error("transport error: {0}")]
    TransportError(#[from] std::io::Error),

    /// An unrecognized frame verb. Not normally observed by callers of
    /// [`crate::session::WireFormat`] -- see the type-level note above.
    #[error("unknown command verb: {0}")]
    UnknownCommand(String),
}

pub type Result<T> = std::result::Result<T, StompError>;
