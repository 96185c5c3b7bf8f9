// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Run a [`Connection`] over an async socket.
//!
//! [`Socket`] reads from an [`AsyncRead`] + [`AsyncWrite`] resource into a
//! [`Buffered`] transport, feeds the connection and writes back whatever the
//! connection produced (handshake response, pongs, close answers, data
//! frames). Each call does a single read, so the caller stays in control of
//! when the socket is polled.

use bytes::BytesMut;
use crate::{connection::{Connection, Error, State}, transport::Buffered};
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use log::trace;
use std::io;

const BLOCK_SIZE: usize = 8192;

/// A websocket server connection on top of an async socket.
#[derive(Debug)]
pub struct Socket<T> {
    socket: T,
    transport: Buffered,
    connection: Connection,
    /// Read buffer.
    buffer: Vec<u8>
}

impl<T: AsyncRead + AsyncWrite + Unpin> Socket<T> {
    /// Create a new socket wrapper awaiting the client handshake.
    pub fn new(socket: T) -> Self {
        Socket {
            socket,
            transport: Buffered::new(),
            connection: Connection::new(),
            buffer: vec![0; BLOCK_SIZE]
        }
    }

    /// Set the maximum number of bytes a single read takes from the socket.
    pub fn set_buffer_size(&mut self, size: usize) -> &mut Self {
        self.buffer.resize(std::cmp::max(1, size), 0);
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Mutable access to the underlying connection, e.g. to set its id.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// The protocol state of the connection.
    pub fn state(&self) -> State {
        self.connection.state()
    }

    /// Read once from the socket and process what was received.
    ///
    /// Once the connection is closed or failed, this returns the state
    /// without touching the socket. End of file is reported as an I/O error.
    pub async fn receive(&mut self) -> Result<State, Error> {
        if self.connection.state().is_terminal() {
            return Ok(self.connection.state())
        }
        let n = self.socket.read(&mut self.buffer).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into())
        }
        trace!("{}: read {} bytes", self.connection.id(), n);
        self.transport.extend_incoming(&self.buffer[.. n]);
        let result = self.connection.feed(&mut self.transport);
        self.flush().await?;
        result
    }

    /// Send `payload` as a single binary frame.
    ///
    /// Does nothing unless the connection is open.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.connection.write(&mut self.transport, payload);
        self.flush().await
    }

    async fn flush(&mut self) -> Result<(), Error> {
        let out = self.transport.take_outgoing();
        if out.is_empty() {
            return Ok(())
        }
        trace!("{}: write {} bytes", self.connection.id(), out.len());
        self.socket.write_all(&out).await?;
        self.socket.flush().await?;
        Ok(())
    }

    /// Copy up to `buf.len()` bytes of received application data into `buf`.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        self.connection.read_into(buf)
    }

    /// Take up to `max_len` bytes of received application data.
    pub fn read(&mut self, max_len: usize) -> BytesMut {
        self.connection.read(max_len)
    }

    /// Number of application data bytes which can be read.
    pub fn available(&self) -> usize {
        self.connection.available()
    }

    /// Get back the socket.
    pub fn into_inner(self) -> T {
        self.socket
    }
}
