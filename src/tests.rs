// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

use bytes::BytesMut;
use crate::{
    base::{self, Masker},
    buffer::OutputBuffer,
    connection::{Connection, State},
    socket::Socket,
    transport::Buffered
};
use futures::{executor::block_on, io::{AsyncRead, AsyncWrite, Cursor}};
use quickcheck::{quickcheck, TestResult};
use std::{io, pin::Pin, task::{Context, Poll}};

pub(crate) const REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
    Host: server.example.com\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
    Sec-WebSocket-Version: 13\r\n\r\n";

const RESPONSE: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
    Upgrade: websocket\r\n\
    Connection: Upgrade\r\n\
    Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";

/// Encode a frame the way a client sends it (fin bit set, masked).
pub(crate) fn client_frame(opcode: u8, payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    base::encode_header(0x80 | opcode, payload.len() as u64, &mut buf);
    buf[1] |= 0x80;
    buf.extend_from_slice(&key);
    let start = buf.len();
    buf.extend_from_slice(payload);
    Masker::new(key).apply(&mut buf[start ..]);
    buf.to_vec()
}

// Feed `bytes` to a fresh connection in chunks of the given sizes (cycled)
// and return the decoded data together with everything written back.
fn run_chunked(bytes: &[u8], sizes: &[usize]) -> (State, Vec<u8>, Vec<u8>) {
    let mut io = Buffered::new();
    let mut c = Connection::new();
    let mut rest = bytes;
    let mut sizes = sizes.iter().cycle();
    let mut state = c.state();
    while !rest.is_empty() {
        let n = std::cmp::min(*sizes.next().unwrap_or(&1), rest.len());
        io.extend_incoming(&rest[.. n]);
        rest = &rest[n ..];
        state = c.feed(&mut io).unwrap_or(State::Error)
    }
    let data = c.read(c.available()).to_vec();
    (state, data, io.take_outgoing().to_vec())
}

// A session with handshake, data, pings and pongs.
fn session(payloads: &[Vec<u8>], mask: u32) -> Vec<u8> {
    let key = mask.to_be_bytes();
    let mut bytes = REQUEST.to_vec();
    for (i, p) in payloads.iter().enumerate() {
        let opcode = match i % 5 {
            3 => 0x9,
            4 => 0xA,
            n => n as u8 % 3
        };
        bytes.extend(client_frame(opcode, p, key))
    }
    bytes
}

#[test]
fn chunking_does_not_change_the_outcome() {
    let _ = env_logger::try_init();
    fn prop(payloads: Vec<Vec<u8>>, mask: u32, sizes: Vec<u8>) -> TestResult {
        if sizes.is_empty() {
            return TestResult::discard()
        }
        let bytes = session(&payloads, mask);
        let sizes: Vec<usize> = sizes.iter().map(|s| usize::from(*s % 32) + 1).collect();
        let whole = run_chunked(&bytes, &[bytes.len()]);
        let chunked = run_chunked(&bytes, &sizes);
        TestResult::from_bool(whole == chunked && whole.0 == State::Open)
    }
    quickcheck(prop as fn(Vec<Vec<u8>>, u32, Vec<u8>) -> TestResult)
}

#[test]
fn byte_wise_feeding() {
    let payloads = vec![b"Hello".to_vec(), vec![7; 300], Vec::new(), b"ping".to_vec(), b"pong".to_vec()];
    let bytes = session(&payloads, 0xDEAD_BEEF);
    let (state, data, out) = run_chunked(&bytes, &[1]);
    assert_eq!(State::Open, state);
    let mut expected = b"Hello".to_vec();
    expected.extend_from_slice(&[7; 300]);
    assert_eq!(expected, data);
    let mut expected_out = RESPONSE.to_vec();
    expected_out.extend_from_slice(b"\x8A\x04ping");
    assert_eq!(expected_out, out)
}

#[test]
fn large_frame_in_chunks() {
    let payload: Vec<u8> = (0 .. 70000_u32).map(|i| (i % 251) as u8).collect();
    let mut bytes = REQUEST.to_vec();
    bytes.extend(client_frame(0x2, &payload, [1, 2, 3, 4]));
    let (state, data, _) = run_chunked(&bytes, &[1000, 1, 4095]);
    assert_eq!(State::Open, state);
    assert_eq!(payload, data)
}

#[test]
fn partial_reads_concatenate() {
    fn prop(chunks: Vec<Vec<u8>>, sizes: Vec<u8>) -> TestResult {
        if sizes.is_empty() {
            return TestResult::discard()
        }
        let mut single = OutputBuffer::new();
        let mut piecewise = OutputBuffer::new();
        for c in &chunks {
            single.append(BytesMut::from(&c[..]));
            piecewise.append(BytesMut::from(&c[..]))
        }
        let total = single.available();
        let all = single.read(total);
        let mut pieces = Vec::new();
        let mut sizes = sizes.iter().cycle();
        while piecewise.available() > 0 {
            let mut buf = vec![0; usize::from(*sizes.next().unwrap_or(&1) % 8) + 1];
            let n = piecewise.read_into(&mut buf);
            pieces.extend_from_slice(&buf[.. n])
        }
        TestResult::from_bool(all.len() == total && all[..] == pieces[..])
    }
    quickcheck(prop as fn(Vec<Vec<u8>>, Vec<u8>) -> TestResult)
}

// Async socket ///////////////////////////////////////////////////////////////////////////////////

// An in-memory socket which hands out at most `chunk` bytes per read.
struct Duplex {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
    chunk: usize
}

impl AsyncRead for Duplex {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        let n = std::cmp::min(buf.len(), self.chunk);
        Pin::new(&mut self.input).poll_read(cx, &mut buf[.. n])
    }
}

impl AsyncWrite for Duplex {
    fn poll_write(mut self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.output.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

const MESSAGES: [&str; 6] = [
    "It was a bright cold day in April,",
    "and the clocks were striking thirteen.",
    "Winston Smith, his chin nuzzled into his breast in an effort to escape the vile wind,",
    "slipped quickly through the glass doors of Victory Mansions,",
    "though not quickly enough to prevent a swirl of gritty dust",
    "from entering along with him."
];

#[test]
fn socket_session() {
    let _ = env_logger::try_init();

    let mut input = REQUEST.to_vec();
    for (i, m) in MESSAGES.iter().enumerate() {
        input.extend(client_frame(0x1, m.as_bytes(), [i as u8, 0x55, 0xAA, 0xFF]));
        if i == 2 {
            input.extend(client_frame(0x9, b"still there?", [9, 8, 7, 6]))
        }
    }
    input.extend(client_frame(0x8, &1000_u16.to_be_bytes(), [0, 0, 0, 0]));

    let duplex = Duplex { input: Cursor::new(input), output: Vec::new(), chunk: 17 };
    let mut socket = Socket::new(duplex);
    socket.set_buffer_size(64).connection_mut().set_id(7);

    let received = block_on(async {
        let mut received = Vec::new();
        loop {
            let state = socket.receive().await.expect("valid client session");
            if state == State::Open && socket.available() > 0 {
                socket.send(b"ack").await.expect("in-memory write");
            }
            let mut buf = [0; 10];
            loop {
                let n = socket.read_into(&mut buf);
                if n == 0 {
                    break
                }
                received.extend_from_slice(&buf[.. n])
            }
            if state.is_terminal() {
                break
            }
        }
        received
    });

    assert_eq!(State::Closed, socket.state());
    assert_eq!(MESSAGES.concat().into_bytes(), received);

    let output = socket.into_inner().output;
    assert!(output.starts_with(RESPONSE));
    assert!(output.ends_with(&[0x88, 0x00]));
    let pong = b"\x8A\x0Cstill there?";
    assert_eq!(1, output.windows(pong.len()).filter(|w| *w == &pong[..]).count());
    assert!(output.windows(5).any(|w| w == b"\x82\x03ack"))
}

#[test]
fn socket_eof_is_an_error() {
    let duplex = Duplex { input: Cursor::new(REQUEST[.. 10].to_vec()), output: Vec::new(), chunk: 100 };
    let mut socket = Socket::new(duplex);
    block_on(async {
        assert_eq!(State::Handshaking, socket.receive().await.unwrap());
        match socket.receive().await {
            Err(crate::connection::Error::Io(e)) => assert_eq!(io::ErrorKind::UnexpectedEof, e.kind()),
            other => panic!("unexpected result: {:?}", other)
        }
    })
}
