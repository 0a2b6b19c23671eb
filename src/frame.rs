//! The in-memory STOMP frame and its bit-exact wire read/write contract.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, StompError};
use crate::header::{self, HeaderMap};

/// A STOMP frame: verb, ordered headers, optional body.
///
/// Owns its bytes rather than borrowing from a decode buffer: frames
/// are also *constructed* from owned command objects on the marshal
/// side, so there is no single buffer lifetime to borrow from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Result of a single frame-level read: either a full command frame or
/// a keep-alive sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFrame {
    Frame(Frame),
    KeepAlive,
}

impl Frame {
    pub fn new(command: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            command: command.into(),
            headers,
            body,
        }
    }

    /// Write contract: verb, `\n`, headers as
    /// `name:value\n` (escaped iff `encode_headers`), a blank line,
    /// the body, and a trailing `\0`.
    pub fn write(&self, encode_headers: bool, out: &mut BytesMut) {
        out.reserve(self.estimated_size());
        out.extend_from_slice(self.command.as_bytes());
        out.put_u8(b'\n');
        for (name, value) in self.headers.iter() {
            write_header_part(name, encode_headers, out);
            out.put_u8(b':');
            write_header_part(value, encode_headers, out);
            out.put_u8(b'\n');
        }
        out.put_u8(b'\n');
        out.extend_from_slice(&self.body);
        out.put_u8(0);
    }

    fn estimated_size(&self) -> usize {
        let headers_len: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum();
        self.command.len() + headers_len + self.body.len() + 8
    }

    /// Write the single-byte keep-alive sentinel (a lone `\n`).
    pub fn write_keepalive(out: &mut BytesMut) {
        out.put_u8(b'\n');
    }

    /// Read contract. Returns:
    /// - `Ok(None)` if `buf` does not yet contain a full frame (decoder
    ///   should wait for more bytes).
    /// - `Ok(Some((parsed, consumed)))` on success, where `consumed` is
    ///   the number of leading bytes of `buf` the frame occupied.
    /// - `Err` on a structural framing violation.
    pub fn parse(buf: &[u8]) -> Result<Option<(ParsedFrame, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if buf[0] == b'\n' {
            return Ok(Some((ParsedFrame::KeepAlive, 1)));
        }
        if buf[0] == b'\r' {
            if buf.len() < 2 {
                return Ok(None);
            }
            if buf[1] == b'\n' {
                return Ok(Some((ParsedFrame::KeepAlive, 2)));
            }
            return Err(StompError::MalformedFrame(
                "lone carriage return outside a line ending".into(),
            ));
        }

        let (command_line, mut pos) = match find_line(buf, 0) {
            Some(v) => v,
            None => return Ok(None),
        };
        let command = std::str::from_utf8(strip_cr(command_line))
            .map_err(|e| StompError::MalformedFrame(format!("non-UTF-8 command: {e}")))?
            .to_owned();

        let mut headers = HeaderMap::new();
        loop {
            let (line, next_pos) = match find_line(buf, pos) {
                Some(v) => v,
                None => return Ok(None),
            };
            let line = strip_cr(line);
            if line.is_empty() {
                pos = next_pos;
                break;
            }
            let colon = line
                .iter()
                .position(|&b| b == b':')
                .ok_or_else(|| StompError::MalformedFrame("header line missing ':'".into()))?;
            let (raw_name, raw_value) = (&line[..colon], &line[colon + 1..]);
            let raw_name = std::str::from_utf8(raw_name)
                .map_err(|e| StompError::MalformedFrame(format!("non-UTF-8 header name: {e}")))?;
            let raw_value = std::str::from_utf8(raw_value)
                .map_err(|e| StompError::MalformedFrame(format!("non-UTF-8 header value: {e}")))?;
            headers.push_first_wins(raw_name.to_owned(), raw_value.to_owned());
            pos = next_pos;
        }

        let body_start = pos;
        let content_length = match headers.get("content-length") {
            Some(raw) => Some(
                raw.parse::<usize>()
                    .map_err(|_| StompError::MalformedFrame(format!("bad content-length: {raw}")))?,
            ),
            None => None,
        };

        let (body, consumed) = match content_length {
            Some(n) => {
                let body_end = body_start + n;
                if buf.len() <= body_end {
                    return Ok(None);
                }
                if buf[body_end] != 0 {
                    return Err(StompError::MalformedFrame(
                        "content-length body not terminated by NUL".into(),
                    ));
                }
                (Bytes::copy_from_slice(&buf[body_start..body_end]), body_end + 1)
            }
            None => match buf[body_start..].iter().position(|&b| b == 0) {
                Some(offset) => (
                    Bytes::copy_from_slice(&buf[body_start..body_start + offset]),
                    body_start + offset + 1,
                ),
                None => return Ok(None),
            },
        };

        Ok(Some((
            ParsedFrame::Frame(Frame::new(command, headers, body)),
            consumed,
        )))
    }
}

fn write_header_part(raw: &str, encode_headers: bool, out: &mut BytesMut) {
    if encode_headers {
        out.extend_from_slice(header::encode_to_string(raw).as_bytes());
    } else {
        out.extend_from_slice(raw.as_bytes());
    }
}

/// Find the next `\n`-terminated line starting at `start`. Escape
/// decoding is NOT done here -- it happens where `encode_headers` is
/// known, in `crate::unmarshal`, which calls [`header::decode`] on
/// each name/value this function hands back raw.
///
/// Returns `(line_without_trailing_newline, position_after_newline)`,
/// or `None` if no `\n` has arrived yet.
fn find_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let rel = buf[start..].iter().position(|&b| b == b'\n')?;
    let end = start + rel;
    Some((&buf[start..end], end + 1))
}

fn strip_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}
