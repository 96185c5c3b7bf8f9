// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Decoded application data waiting to be read.

use bytes::BytesMut;
use std::{cmp::min, collections::VecDeque};

/// An ordered queue of unmasked payload chunks.
///
/// Chunks are kept as they were decoded; readers see one continuous byte
/// stream and cannot tell where one frame ended and the next began.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    chunks: VecDeque<BytesMut>,
    /// Bytes of the front chunk which have already been read.
    offset: usize,
    /// Unread bytes across all chunks.
    total: usize
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    /// Number of bytes which can be read.
    pub fn available(&self) -> usize {
        self.total
    }

    /// Append a chunk at the end.
    pub fn append(&mut self, chunk: BytesMut) {
        if chunk.is_empty() {
            return
        }
        self.total += chunk.len();
        self.chunks.push_back(chunk)
    }

    /// Copy up to `buf.len()` bytes into `buf`, returning how many were copied.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            let front = match self.chunks.front() {
                Some(front) => front,
                None => break
            };
            let step = min(front.len() - self.offset, buf.len() - n);
            buf[n .. n + step].copy_from_slice(&front[self.offset .. self.offset + step]);
            n += step;
            self.offset += step;
            if self.offset == front.len() {
                self.chunks.pop_front();
                self.offset = 0
            }
        }
        self.total -= n;
        n
    }

    /// Take up to `max_len` bytes.
    pub fn read(&mut self, max_len: usize) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.resize(min(max_len, self.total), 0);
        let n = self.read_into(&mut buf);
        debug_assert_eq!(n, buf.len());
        buf
    }
}
