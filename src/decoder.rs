// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Incremental decoding of client frames.
//!
//! The [`Decoder`] is driven by the bytes a transport currently has
//! available. Each step of a frame (header, extended length, mask key,
//! payload) is only taken once all bytes it needs are there, except for
//! payloads which are consumed as they arrive. When the transport runs dry
//! the decoder returns and picks up at the same step on the next call.

use crate::{
    base::{self, Masker, OpCode, PayloadKind, CLOSE_HEADER, EIGHT_EXT, PONG_HEADER, TWO_EXT},
    buffer::OutputBuffer,
    transport::Transport
};
use log::{debug, trace};
use smallvec::SmallVec;
use std::{cmp::min, convert::TryFrom};

// Ping payloads are control frame bodies and normally fit inline.
const PING_INLINE: usize = 128;

static_assertions::const_assert!(PING_INLINE >= base::MAX_SHORT_LENGTH as usize);

/// The part of a frame the decoder reads next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Opcode byte plus mask bit and 7-bit length code.
    Header,
    /// 16-bit big-endian payload length.
    Length16,
    /// 64-bit big-endian payload length.
    Length64,
    /// The 4-byte mask key.
    MaskKey,
    /// Payload bytes.
    Payload,
    /// A close frame was answered; nothing more is read.
    Closed
}

/// The outcome of [`Decoder::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// All available bytes have been consumed or the next step needs more.
    Pending,
    /// A close frame was received and answered.
    Closed
}

// What to do after a step.
#[derive(Debug)]
enum Progress {
    Continue,
    Suspend,
    Closed
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    remaining: u64,
    kind: PayloadKind,
    masker: Masker
}

/// Resumable decoder of masked client frames.
#[derive(Debug)]
pub struct Decoder {
    id: u32,
    step: Step,
    frame: PendingFrame,
    /// Unmasked ping payload received so far.
    ping: SmallVec<[u8; PING_INLINE]>
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl Decoder {
    /// Create a decoder expecting the start of a frame.
    pub fn new() -> Self {
        Decoder {
            id: 0,
            step: Step::Header,
            frame: PendingFrame { remaining: 0, kind: PayloadKind::Data, masker: Masker::default() },
            ping: SmallVec::new()
        }
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id
    }

    /// The step the next call to [`Decoder::decode`] starts with.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Payload bytes of the current frame not yet received.
    pub fn remaining(&self) -> u64 {
        self.frame.remaining
    }

    /// Decode as much as the available bytes of `io` allow.
    ///
    /// Data payloads are unmasked into `out`. Pings are answered with pongs,
    /// pongs are dropped and a close frame is answered with a close frame.
    /// Once closed, further calls return [`Decoded::Closed`] without reading.
    pub fn decode<T>(&mut self, io: &mut T, out: &mut OutputBuffer) -> Result<Decoded, base::Error>
    where
        T: Transport + ?Sized
    {
        loop {
            let progress = match self.step {
                Step::Header => self.read_header(io)?,
                Step::Length16 => self.read_length16(io),
                Step::Length64 => self.read_length64(io),
                Step::MaskKey => self.read_mask_key(io),
                Step::Payload => self.read_payload(io, out),
                Step::Closed => Progress::Closed
            };
            match progress {
                Progress::Continue => {}
                Progress::Suspend => return Ok(Decoded::Pending),
                Progress::Closed => return Ok(Decoded::Closed)
            }
        }
    }

    fn read_header<T: Transport + ?Sized>(&mut self, io: &mut T) -> Result<Progress, base::Error> {
        if io.bytes_available() < 2 {
            return Ok(Progress::Suspend)
        }
        let mut header = [0; 2];
        io.read_exact(&mut header);

        // Fin and reserved bits are ignored.
        let opcode = OpCode::try_from(header[0] & 0x0F)?;
        trace!("{}: recv: {} frame", self.id, opcode);

        if opcode == OpCode::Close {
            debug!("{}: received close frame", self.id);
            base::write_frame(io, CLOSE_HEADER, &[]);
            io.flush();
            self.step = Step::Closed;
            return Ok(Progress::Closed)
        }

        if header[1] & 0x80 == 0 {
            return Err(base::Error::Unmasked)
        }

        self.frame.kind = opcode.kind();
        match header[1] & 0x7F {
            TWO_EXT => self.step = Step::Length16,
            EIGHT_EXT => self.step = Step::Length64,
            n => {
                self.frame.remaining = u64::from(n);
                self.step = Step::MaskKey
            }
        }
        Ok(Progress::Continue)
    }

    fn read_length16<T: Transport + ?Sized>(&mut self, io: &mut T) -> Progress {
        if io.bytes_available() < 2 {
            return Progress::Suspend
        }
        let mut len = [0; 2];
        io.read_exact(&mut len);
        self.frame.remaining = u64::from(u16::from_be_bytes(len));
        self.step = Step::MaskKey;
        Progress::Continue
    }

    fn read_length64<T: Transport + ?Sized>(&mut self, io: &mut T) -> Progress {
        if io.bytes_available() < 8 {
            return Progress::Suspend
        }
        let mut len = [0; 8];
        io.read_exact(&mut len);
        self.frame.remaining = u64::from_be_bytes(len);
        self.step = Step::MaskKey;
        Progress::Continue
    }

    fn read_mask_key<T: Transport + ?Sized>(&mut self, io: &mut T) -> Progress {
        if io.bytes_available() < 4 {
            return Progress::Suspend
        }
        let mut key = [0; 4];
        io.read_exact(&mut key);
        self.frame.masker = Masker::new(key);
        self.step = Step::Payload;
        trace!("{}: recv: payload of {} bytes", self.id, self.frame.remaining);
        Progress::Continue
    }

    fn read_payload<T>(&mut self, io: &mut T, out: &mut OutputBuffer) -> Progress
    where
        T: Transport + ?Sized
    {
        if self.frame.remaining == 0 {
            if self.frame.kind == PayloadKind::Ping {
                trace!("{}: send: pong of {} bytes", self.id, self.ping.len());
                base::write_frame(io, PONG_HEADER, &self.ping);
                self.ping.clear()
            }
            self.step = Step::Header;
            return Progress::Continue
        }

        let available = io.bytes_available();
        if available == 0 {
            return Progress::Suspend
        }
        let n = min(self.frame.remaining, available as u64) as usize;

        match self.frame.kind {
            PayloadKind::Data => {
                let mut data = io.read(n);
                self.frame.masker.apply(&mut data);
                self.frame.remaining -= data.len() as u64;
                out.append(data)
            }
            PayloadKind::Ping => {
                let mut data = io.read(n);
                self.frame.masker.apply(&mut data);
                self.frame.remaining -= data.len() as u64;
                self.ping.extend_from_slice(&data)
            }
            PayloadKind::Pong => {
                io.skip(n);
                self.frame.remaining -= n as u64
            }
            // Close frames end decoding at their header.
            PayloadKind::Close => {
                self.step = Step::Closed;
                return Progress::Closed
            }
        }

        Progress::Continue
    }
}
