//! ferrite-protocol: the binary wire protocol.
//!
//! Every exchange is a length-prefixed frame, all integers big-endian:
//!
//! ```text
//! request:  [length: u32][version: u8][command: u8][payload: length-2 bytes]
//! response: [status: u8][datalen: u32][data: datalen bytes]
//! ```
//!
//! Parsing is split in two stages. [`parse_frame`] pulls one complete frame
//! out of a receive buffer (returning `Ok(None)` until enough bytes have
//! arrived), and [`Request::decode`] turns a frame's command byte and payload
//! into a typed [`Request`]. Framing errors mean the stream can no longer be
//! trusted and the caller should drop the connection; payload errors are
//! recoverable and map to an `ERROR` response on an open connection;
//! [`ProtocolError::is_framing`] tells the two apart.
//!
//! # quick start
//!
//! ```
//! use bytes::Bytes;
//! use ferrite_protocol::{parse_frame, opcode, Request};
//!
//! // GET "foo": length=9 covers version + command + payload
//! let wire = Bytes::from_static(b"\x00\x00\x00\x09\x01\x02\x00\x00\x00\x03foo");
//! let (frame, consumed) = parse_frame(&wire).unwrap().unwrap();
//! assert_eq!(consumed, wire.len());
//! assert_eq!(frame.command, opcode::GET);
//!
//! let req = Request::decode(frame.command, &frame.payload).unwrap();
//! assert_eq!(req, Request::Get { key: Bytes::from_static(b"foo") });
//! ```

pub mod error;
pub mod parse;
pub mod response;
pub mod types;

pub use error::ProtocolError;
pub use parse::{parse_frame, Frame, MAX_FRAME_LEN, PROTOCOL_VERSION};
pub use response::{Response, Status, NIL_LEN};
pub use types::{opcode, Request, SetEntry};
