// Copyright (c) 2019 Parity Technologies (UK) Ltd.
//
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The server side of the [RFC6455][rfc6455] websocket protocol on top of a
//! non-blocking byte stream.
//!
//! A [`Connection`] completes the opening handshake and decodes client
//! frames as bytes become available, resuming exactly where it left off when
//! the transport runs dry. The payloads of all data frames (text, binary and
//! continuation alike) are joined into one continuous byte stream: message
//! boundaries are not preserved. Pings are answered, pongs are ignored and a
//! close frame is answered and ends the connection.
//!
//! Outgoing data is always sent as single, unmasked binary frames.
//!
//! ```
//! use flatsock::{Buffered, Connection, State};
//!
//! let mut io = Buffered::new();
//! let mut connection = Connection::new();
//!
//! io.extend_incoming(b"GET / HTTP/1.1\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n");
//! assert_eq!(State::Open, connection.feed(&mut io).unwrap());
//!
//! // A masked text frame containing "Hello".
//! io.extend_incoming(&[0x81, 0x85, 0x37, 0xFA, 0x21, 0x3D, 0x7F, 0x9F, 0x4D, 0x51, 0x58]);
//! connection.feed(&mut io).unwrap();
//! assert_eq!(&b"Hello"[..], &connection.read(1024)[..]);
//! ```
//!
//! [rfc6455]: https://tools.ietf.org/html/rfc6455

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod base;
pub mod buffer;
pub mod connection;
pub mod decoder;
pub mod handshake;
pub mod socket;
pub mod transport;

#[cfg(test)]
mod tests;

pub use connection::{Connection, Error, State};
pub use socket::Socket;
pub use transport::{Buffered, Transport};
