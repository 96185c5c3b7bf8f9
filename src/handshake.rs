// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Websocket server [handshake].
//!
//! Only the `Sec-WebSocket-Key` header of the client request is looked at.
//! Request line, HTTP version and all other headers are accepted as they are.
//!
//! [handshake]: https://tools.ietf.org/html/rfc6455#section-4

use base64::Engine;
use bytes::BytesMut;
use crate::transport::Transport;
use log::debug;
use sha1::{Digest, Sha1};

// Defined in RFC6455 and used to generate the `Sec-WebSocket-Accept` header
// in the server handshake response.
const KEY: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const SEC_WEBSOCKET_KEY: &[u8] = b"Sec-WebSocket-Key:";

// A base64 encoded 16 byte nonce, counted in bytes.
const KEY_LEN: usize = 24;

const RESPONSE_HEAD: &[u8] =
    b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: ";

const RESPONSE_TAIL: &[u8] = b"\r\n\r\n";

/// Compute the `Sec-WebSocket-Accept` value for a client's `Sec-WebSocket-Key`.
pub fn accept_key(key: &[u8]) -> String {
    let mut digest = Sha1::new();
    digest.update(key);
    digest.update(KEY);
    base64::engine::general_purpose::STANDARD.encode(digest.finalize())
}

/// Outcome of one handshake step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsing {
    /// The request end has not been seen yet.
    NeedMore,
    /// The response has been written.
    Done
}

/// Server side handshake negotiator.
///
/// Scans the client request line by line. Every call consumes the complete
/// lines currently available and keeps the accept value computed so far,
/// so it can be driven by repeated "bytes readable" notifications.
#[derive(Debug, Default)]
pub struct Handshake {
    accept: Option<String>
}

impl Handshake {
    /// Create a new negotiator.
    pub fn new() -> Self {
        Handshake::default()
    }

    /// The accept value, once the client key has been seen.
    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// Consume the request lines available in `io`.
    ///
    /// On the empty line terminating the request the switching protocols
    /// response is written and flushed.
    pub fn advance<T: Transport + ?Sized>(&mut self, io: &mut T) -> Result<Parsing, Error> {
        while let Some(line) = io.read_line() {
            if &line[..] == b"\r\n" {
                let accept = self.accept.as_ref().ok_or(Error::MissingKey)?;
                let mut response = BytesMut::with_capacity(RESPONSE_HEAD.len() + accept.len() + 4);
                response.extend_from_slice(RESPONSE_HEAD);
                response.extend_from_slice(accept.as_bytes());
                response.extend_from_slice(RESPONSE_TAIL);
                io.write(&response);
                io.flush();
                debug!("handshake response sent");
                return Ok(Parsing::Done)
            }
            if let Some(value) = header_value(&line, SEC_WEBSOCKET_KEY) {
                let key = trim(value);
                if key.len() != KEY_LEN {
                    return Err(Error::MalformedKey(key.len()))
                }
                if self.accept.is_some() {
                    debug!("ignoring repeated Sec-WebSocket-Key header");
                    continue
                }
                debug!("received Sec-WebSocket-Key");
                self.accept = Some(accept_key(key))
            }
        }
        Ok(Parsing::NeedMore)
    }
}

/// The value part of `line`, if it starts with the header `name`
/// (ASCII case-insensitive, `name` includes the colon).
fn header_value<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    if line.len() >= name.len() && line[.. name.len()].eq_ignore_ascii_case(name) {
        Some(&line[name.len() ..])
    } else {
        None
    }
}

fn trim(x: &[u8]) -> &[u8] {
    let from = match x.iter().position(|x| !x.is_ascii_whitespace()) {
        Some(i) => i,
        None => return &[]
    };
    let to = x.iter().rposition(|x| !x.is_ascii_whitespace()).unwrap_or(from);
    &x[from ..= to]
}

// Handshake error type ///////////////////////////////////////////////////////////////////////////

/// Enumeration of possible handshake errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request ended without a `Sec-WebSocket-Key` header.
    #[error("Sec-WebSocket-Key header not found")]
    MissingKey,
    /// The `Sec-WebSocket-Key` value does not have the length of a base64
    /// encoded 16 byte nonce. The length is counted in bytes.
    #[error("Sec-WebSocket-Key has invalid length {0}")]
    MalformedKey(usize)
}
