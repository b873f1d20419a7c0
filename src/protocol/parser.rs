//! RESP Request Decoder
//!
//! Decodes client requests into [`RequestCommand`]s. Clients send either a
//! RESP array of bulk strings or a plain inline command line:
//!
//! ```text
//! *3\r\n$5\r\nZCARD\r\n$5\r\nmyset\r\n     (array form)
//! ZCARD myset\r\n                         (inline form)
//! ```
//!
//! The decoder reads from a buffer and returns either:
//! - `Ok(Some((command, consumed)))` - a complete command, `consumed` bytes used
//! - `Ok(None)` - the request is incomplete, read more data
//! - `Err(ParseError)` - the client broke the protocol
//!
//! Empty arrays (`*0\r\n`) carry no command and are skipped.

use crate::protocol::command::RequestCommand;
use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding a request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid length header
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Bulk string length is negative
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// Request array length is negative or too large
    #[error("invalid multibulk length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, wrong element type, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The request exceeds maximum allowed size
    #[error("request too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single argument (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of arguments in one request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Decoder for RESP client requests.
#[derive(Debug, Default)]
pub struct CommandDecoder;

impl CommandDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one command from the front of `buf`.
    pub fn decode(&mut self, buf: &[u8]) -> ParseResult<Option<(RequestCommand, usize)>> {
        let mut offset = 0;

        while offset < buf.len() {
            let frame = &buf[offset..];
            let decoded = if frame[0] == prefix::ARRAY {
                decode_array(frame)?
            } else {
                decode_inline(frame)?
            };

            match decoded {
                None => return Ok(None),
                Some((args, consumed)) => {
                    offset += consumed;
                    if let Some(command) = RequestCommand::from_args(args) {
                        return Ok(Some((command, offset)));
                    }
                }
            }
        }

        Ok(None)
    }
}

/// Decodes `*<count>\r\n` followed by `count` bulk strings.
fn decode_array(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    let (count, mut consumed) = match read_length(&buf[1..])? {
        Some((n, used)) => (n, 1 + used),
        None => return Ok(None),
    };

    if count < 0 || count as usize > MAX_ARGS {
        return Err(ParseError::InvalidArrayLength(count));
    }

    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match decode_bulk(&buf[consumed..])? {
            Some((arg, used)) => {
                args.push(arg);
                consumed += used;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((args, consumed)))
}

/// Decodes `$<length>\r\n<data>\r\n`.
fn decode_bulk(buf: &[u8]) -> ParseResult<Option<(Bytes, usize)>> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    if first != prefix::BULK_STRING {
        return Err(ParseError::ProtocolError(format!(
            "expected '$', got '{}'",
            first as char
        )));
    }

    let (length, header) = match read_length(&buf[1..])? {
        Some((n, used)) => (n, 1 + used),
        None => return Ok(None),
    };

    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }
    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total = header + length + 2;
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + length..total] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    Ok(Some((
        Bytes::copy_from_slice(&buf[header..header + length]),
        total,
    )))
}

/// Decodes a whitespace-separated command line.
fn decode_inline(buf: &[u8]) -> ParseResult<Option<(Vec<Bytes>, usize)>> {
    let Some(pos) = find_crlf(buf) else {
        return Ok(None);
    };

    let args = buf[..pos]
        .split(|b| b.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .map(Bytes::copy_from_slice)
        .collect();

    Ok(Some((args, pos + 2)))
}

/// Reads `<integer>\r\n`, returning the value and the bytes used.
fn read_length(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let Some(pos) = find_crlf(buf) else {
        return Ok(None);
    };

    let text = std::str::from_utf8(&buf[..pos])
        .map_err(|e| ParseError::InvalidInteger(e.to_string()))?;
    let n = text
        .parse::<i64>()
        .map_err(|e| ParseError::InvalidInteger(format!("{}: {}", text, e)))?;

    Ok(Some((n, pos + 2)))
}

/// Returns the position of the first `\r\n`, if any.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
