// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The byte stream a [`Connection`](crate::connection::Connection) runs on.
//!
//! The connection never blocks on its transport. It only ever asks for as
//! many bytes as [`Transport::bytes_available`] reports, and writes are
//! assumed to be accepted immediately.

use bytes::{Buf, BytesMut};

/// A non-blocking, byte-oriented duplex channel.
pub trait Transport {
    /// Number of bytes which can be read without blocking.
    fn bytes_available(&self) -> usize;

    /// Take one complete line, including its `\n` terminator.
    ///
    /// Returns `None` if no complete line is buffered yet; the partial line
    /// stays in the transport. Only used during the handshake.
    fn read_line(&mut self) -> Option<BytesMut>;

    /// Fill `buf` completely. Callers make sure enough bytes are available.
    fn read_exact(&mut self, buf: &mut [u8]);

    /// Take up to `n` bytes.
    fn read(&mut self, n: usize) -> BytesMut;

    /// Drop up to `n` bytes.
    fn skip(&mut self, n: usize);

    /// Queue bytes for sending.
    fn write(&mut self, bytes: &[u8]);

    /// Push queued bytes towards the remote end.
    fn flush(&mut self);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn bytes_available(&self) -> usize {
        (**self).bytes_available()
    }

    fn read_line(&mut self) -> Option<BytesMut> {
        (**self).read_line()
    }

    fn read_exact(&mut self, buf: &mut [u8]) {
        (**self).read_exact(buf)
    }

    fn read(&mut self, n: usize) -> BytesMut {
        (**self).read(n)
    }

    fn skip(&mut self, n: usize) {
        (**self).skip(n)
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}

/// An in-memory [`Transport`].
///
/// Received bytes are queued with [`Buffered::extend_incoming`], bytes
/// written by the connection are collected until taken out with
/// [`Buffered::take_outgoing`].
#[derive(Debug, Default)]
pub struct Buffered {
    incoming: BytesMut,
    outgoing: BytesMut
}

impl Buffered {
    /// Create an empty transport.
    pub fn new() -> Self {
        Buffered::default()
    }

    /// Queue bytes received from the remote end.
    pub fn extend_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend_from_slice(bytes)
    }

    /// Bytes written so far and not yet taken.
    pub fn outgoing(&self) -> &[u8] {
        &self.outgoing
    }

    /// Take all bytes written so far.
    pub fn take_outgoing(&mut self) -> BytesMut {
        self.outgoing.split()
    }
}

impl Transport for Buffered {
    fn bytes_available(&self) -> usize {
        self.incoming.len()
    }

    fn read_line(&mut self) -> Option<BytesMut> {
        let end = self.incoming.iter().position(|&b| b == b'\n')?;
        Some(self.incoming.split_to(end + 1))
    }

    fn read_exact(&mut self, buf: &mut [u8]) {
        debug_assert!(buf.len() <= self.incoming.len());
        self.incoming.copy_to_slice(buf)
    }

    fn read(&mut self, n: usize) -> BytesMut {
        let n = std::cmp::min(n, self.incoming.len());
        self.incoming.split_to(n)
    }

    fn skip(&mut self, n: usize) {
        let n = std::cmp::min(n, self.incoming.len());
        self.incoming.advance(n)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.outgoing.extend_from_slice(bytes)
    }

    // Nothing to do: outgoing bytes are available to `take_outgoing` as soon
    // as they are written.
    fn flush(&mut self) {}
}
