// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The server side of a websocket connection.

use bytes::BytesMut;
use crate::{
    base::{self, BINARY_HEADER},
    buffer::OutputBuffer,
    decoder::{Decoded, Decoder},
    handshake::{self, Handshake, Parsing},
    transport::Transport
};
use log::{debug, trace, warn};
use std::io;

// Connection state ///////////////////////////////////////////////////////////////////////////////

/// Protocol state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing has been received yet.
    /// Possible transitions: `Handshaking`.
    None,
    /// Reading the client's handshake request.
    /// Possible transitions: `Open`, `Error`.
    Handshaking,
    /// Frames are being exchanged.
    /// Possible transitions: `Closed`, `Error`.
    Open,
    /// A close frame was received and answered (terminal state).
    Closed,
    /// The client violated the protocol (terminal state).
    Error
}

impl State {
    /// Is this `Closed` or `Error`?
    pub fn is_terminal(self) -> bool {
        match self {
            State::Closed | State::Error => true,
            State::None | State::Handshaking | State::Open => false
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::None
    }
}

// Connection /////////////////////////////////////////////////////////////////////////////////////

/// A websocket server connection on top of some [`Transport`].
///
/// The connection does not own its transport. Whenever the transport has
/// new bytes to read, call [`Connection::feed`]; it completes the handshake
/// first and then decodes client frames. Application data of all data frames
/// end up in one continuous byte stream, obtained with [`Connection::read`]
/// or [`Connection::read_into`].
#[derive(Debug, Default)]
pub struct Connection {
    id: u32,
    state: State,
    handshake: Handshake,
    decoder: Decoder,
    buffer: OutputBuffer
}

impl Connection {
    /// Create a new connection awaiting the client handshake.
    pub fn new() -> Self {
        Connection::default()
    }

    /// Set the id used to tag log messages of this connection.
    pub fn set_id(&mut self, id: u32) -> &mut Self {
        self.id = id;
        self.decoder.set_id(id);
        self
    }

    /// The id used to tag log messages.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The current protocol state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Process the bytes `io` has available.
    ///
    /// Returns the state after processing. If the client violated the
    /// protocol, the connection enters [`State::Error`] and the violation is
    /// returned. Once the state is terminal, further calls do nothing.
    /// Tearing down the transport is left to the caller.
    pub fn feed<T: Transport + ?Sized>(&mut self, io: &mut T) -> Result<State, Error> {
        if self.state == State::None {
            self.state = State::Handshaking
        }

        if self.state == State::Handshaking {
            match self.handshake.advance(io) {
                Ok(Parsing::NeedMore) => return Ok(self.state),
                Ok(Parsing::Done) => {
                    debug!("{}: handshake complete", self.id);
                    self.state = State::Open
                }
                Err(e) => return Err(self.fail(e.into()))
            }
        }

        if self.state == State::Open {
            match self.decoder.decode(io, &mut self.buffer) {
                Ok(Decoded::Pending) => {}
                Ok(Decoded::Closed) => {
                    debug!("{}: closed", self.id);
                    self.state = State::Closed
                }
                Err(e) => return Err(self.fail(e.into()))
            }
        }

        Ok(self.state)
    }

    fn fail(&mut self, e: Error) -> Error {
        warn!("{}: {}", self.id, e);
        self.state = State::Error;
        e
    }

    /// Send `payload` as a single binary frame.
    ///
    /// Does nothing unless the connection is open.
    pub fn write<T: Transport + ?Sized>(&mut self, io: &mut T, payload: &[u8]) {
        if self.state != State::Open {
            trace!("{}: not open; dropping {} bytes", self.id, payload.len());
            return
        }
        trace!("{}: send: binary frame of {} bytes", self.id, payload.len());
        base::write_frame(io, BINARY_HEADER, payload)
    }

    /// Copy up to `buf.len()` bytes of application data into `buf`.
    ///
    /// Returns the number of bytes copied, which is less than `buf.len()` if
    /// less data is available.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.buffer.read_into(buf)
    }

    /// Take up to `max_len` bytes of application data.
    pub fn read(&mut self, max_len: usize) -> BytesMut {
        self.buffer.read(max_len)
    }

    /// Number of application data bytes which can be read.
    pub fn available(&self) -> usize {
        self.buffer.available()
    }
}

// Connection error type //////////////////////////////////////////////////////////////////////////

/// Connection error cases.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client handshake request was unacceptable.
    #[error("handshake error: {0}")]
    Handshake(#[from] handshake::Error),
    /// A client frame violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] base::Error),
    /// The underlying socket failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error)
}
