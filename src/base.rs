// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Websocket [base] frame primitives: opcodes, payload masking and the
//! header encoding used for every frame the server sends.
//!
//! [base]: https://tools.ietf.org/html/rfc6455#section-5.2

use bytes::{BufMut, BytesMut};
use crate::transport::Transport;
use std::{convert::TryFrom, fmt};

/// Largest payload length which is encoded directly in the 7-bit length code.
pub const MAX_SHORT_LENGTH: u8 = 125;

/// If the payload length byte is 126, the following two bytes represent the
/// actual payload length.
pub(crate) const TWO_EXT: u8 = 126;

/// If the payload length byte is 127, the following eight bytes represent
/// the actual payload length.
pub(crate) const EIGHT_EXT: u8 = 127;

/// Single frame binary message (fin bit set, opcode 2).
pub(crate) const BINARY_HEADER: u8 = 0x80 | 0x2;

/// Single frame pong (fin bit set, opcode 10).
pub(crate) const PONG_HEADER: u8 = 0x80 | 0xA;

/// Single frame close (fin bit set, opcode 8).
pub(crate) const CLOSE_HEADER: u8 = 0x80 | 0x8;

// OpCode /////////////////////////////////////////////////////////////////////////////////////////

/// Operation codes defined in [RFC6455](https://tools.ietf.org/html/rfc6455#section-5.2)
/// which a server accepts from a client.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum OpCode {
    /// Indicates a continuation frame of a fragmented message.
    Continue,
    /// Indicates a text data frame.
    Text,
    /// Indicates a binary data frame.
    Binary,
    /// Indicates a close control frame.
    Close,
    /// Indicates a ping control frame.
    Ping,
    /// Indicates a pong control frame.
    Pong
}

impl OpCode {
    /// The kind of payload frames with this opcode carry.
    ///
    /// Continuation, text and binary frames are all plain data: message
    /// boundaries and fragmentation are not preserved.
    pub fn kind(self) -> PayloadKind {
        match self {
            OpCode::Continue | OpCode::Text | OpCode::Binary => PayloadKind::Data,
            OpCode::Close => PayloadKind::Close,
            OpCode::Ping => PayloadKind::Ping,
            OpCode::Pong => PayloadKind::Pong
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpCode::Continue => f.write_str("Continue"),
            OpCode::Text => f.write_str("Text"),
            OpCode::Binary => f.write_str("Binary"),
            OpCode::Close => f.write_str("Close"),
            OpCode::Ping => f.write_str("Ping"),
            OpCode::Pong => f.write_str("Pong")
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(val: u8) -> Result<OpCode, Self::Error> {
        match val {
            0 => Ok(OpCode::Continue),
            1 => Ok(OpCode::Text),
            2 => Ok(OpCode::Binary),
            8 => Ok(OpCode::Close),
            9 => Ok(OpCode::Ping),
            10 => Ok(OpCode::Pong),
            n => Err(Error::UnknownOpCode(n))
        }
    }
}

impl From<OpCode> for u8 {
    fn from(opcode: OpCode) -> u8 {
        match opcode {
            OpCode::Continue => 0,
            OpCode::Text => 1,
            OpCode::Binary => 2,
            OpCode::Close => 8,
            OpCode::Ping => 9,
            OpCode::Pong => 10
        }
    }
}

/// What the payload of a frame is used for.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum PayloadKind {
    /// Application data, appended to the output buffer.
    Data,
    /// Echoed back in a pong.
    Ping,
    /// Discarded.
    Pong,
    /// Never read; the connection closes on the header.
    Close
}

// Masking ////////////////////////////////////////////////////////////////////////////////////////

/// A 4-byte mask key together with the position of the next payload byte
/// within the key.
///
/// The position carries over between calls to [`Masker::apply`], so one
/// frame payload can be unmasked piecewise as it arrives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Masker {
    key: [u8; 4],
    index: usize
}

impl Masker {
    /// Create a masker for the given key, starting at key byte 0.
    pub fn new(key: [u8; 4]) -> Self {
        Masker { key, index: 0 }
    }

    /// Index of the key byte the next payload byte is XORed with.
    pub fn index(&self) -> usize {
        self.index
    }

    /// (Un-)mask the given bytes in place.
    pub fn apply(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte ^= self.key[self.index];
            self.index = (self.index + 1) % 4
        }
    }
}

// Frame encoding /////////////////////////////////////////////////////////////////////////////////

/// Append a frame header to `buf`.
///
/// `first` is the complete first header byte (fin bit and opcode). The
/// payload length is encoded with the smallest representation possible.
/// Server frames are never masked.
pub fn encode_header(first: u8, len: u64, buf: &mut BytesMut) {
    buf.reserve(10);
    buf.put_u8(first);
    if len <= u64::from(MAX_SHORT_LENGTH) {
        buf.put_u8(len as u8)
    } else if len <= u64::from(u16::MAX) {
        buf.put_u8(TWO_EXT);
        buf.put_u16(len as u16)
    } else {
        buf.put_u8(EIGHT_EXT);
        buf.put_u64(len)
    }
}

/// Write a single, unmasked frame to the transport.
pub(crate) fn write_frame<T: Transport + ?Sized>(io: &mut T, first: u8, payload: &[u8]) {
    let mut header = BytesMut::with_capacity(10);
    encode_header(first, payload.len() as u64, &mut header);
    io.write(&header);
    if !payload.is_empty() {
        io.write(payload)
    }
}

// Protocol error type ////////////////////////////////////////////////////////////////////////////

/// Violations of the framing protocol by the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The frame carried an opcode the server does not understand.
    #[error("unknown opcode: {0}")]
    UnknownOpCode(u8),
    /// A client frame did not have the mask bit set.
    #[error("client frame is not masked")]
    Unmasked
}

// Tests //////////////////////////////////////////////////////////////////////////////////////////
