//! Frame reading and request decoding.
//!
//! [`parse_frame`] operates on a buffered byte slice: the caller reads data
//! from the network into a `Bytes` buffer and retries once more data arrives.
//! `Ok(None)` means the buffer doesn't hold a complete frame yet; a framing
//! error means the stream is unrecoverable.
//!
//! Payload decoding is a separate, infallible-on-the-stream step:
//! [`Request::decode`] only ever consumes the payload slice that framing
//! already bounded, so a malformed payload never desynchronizes the
//! connection. All multi-byte integers are big-endian. Payload slices are
//! zero-copy `Bytes::slice()` views into the receive buffer.

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::types::{opcode, Request, SetEntry};

/// The protocol version this server speaks. Frames carrying any other
/// version byte fail the read.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Hard cap on the declared frame length (64 MiB). Prevents a single client
/// from pinning an arbitrarily large receive buffer with one huge length
/// prefix.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Cap for `Vec::with_capacity` when a payload declares an element count.
/// The count still bounds the parse loop; this only limits the upfront
/// allocation for hostile counts.
const PREALLOC_CAP: usize = 1024;

/// A framed message: command byte plus its raw payload.
///
/// The version byte is validated during framing and not carried along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    pub payload: Bytes,
}

/// Pulls one complete frame out of `buf`.
///
/// Returns `Ok(Some((frame, consumed)))` when a full frame is available,
/// `Ok(None)` when more data is needed, and a framing error when the stream
/// is malformed (bad version, out-of-bounds length).
pub fn parse_frame(buf: &Bytes) -> Result<Option<(Frame, usize)>, ProtocolError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let length = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if length < 2 {
        return Err(ProtocolError::FrameTooShort(length));
    }
    if length > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(length));
    }

    let total = 4 + length as usize;
    if buf.len() < total {
        return Ok(None);
    }

    let version = buf[4];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let frame = Frame {
        command: buf[5],
        payload: buf.slice(6..total),
    };
    Ok(Some((frame, total)))
}

impl Request {
    /// Decodes a frame's payload into a typed request.
    ///
    /// Errors here are payload errors: the frame itself was well-formed, so
    /// the caller answers with an `ERROR` response and keeps reading.
    pub fn decode(command: u8, payload: &Bytes) -> Result<Request, ProtocolError> {
        decode_request(command, payload, true)
    }
}

fn decode_request(
    command: u8,
    payload: &Bytes,
    allow_batch: bool,
) -> Result<Request, ProtocolError> {
    let mut r = Reader::new(payload);

    match command {
        opcode::SET => {
            let key = r.len_prefixed("key")?;
            let ttl = r.u32("ttl")?;
            let value = r.len_prefixed("value")?;
            Ok(Request::Set { key, ttl, value })
        }

        opcode::GET => Ok(Request::Get {
            key: r.len_prefixed("key")?,
        }),
        opcode::DEL => Ok(Request::Del {
            key: r.len_prefixed("key")?,
        }),
        opcode::EXISTS => Ok(Request::Exists {
            key: r.len_prefixed("key")?,
        }),
        opcode::TTL => Ok(Request::Ttl {
            key: r.len_prefixed("key")?,
        }),
        opcode::LLEN => Ok(Request::LLen {
            key: r.len_prefixed("key")?,
        }),
        opcode::SMEMBERS => Ok(Request::SMembers {
            key: r.len_prefixed("key")?,
        }),
        opcode::SCARD => Ok(Request::SCard {
            key: r.len_prefixed("key")?,
        }),
        opcode::HGETALL => Ok(Request::HGetAll {
            key: r.len_prefixed("key")?,
        }),
        opcode::HLEN => Ok(Request::HLen {
            key: r.len_prefixed("key")?,
        }),
        opcode::INCR => Ok(Request::Incr {
            key: r.len_prefixed("key")?,
        }),
        opcode::DECR => Ok(Request::Decr {
            key: r.len_prefixed("key")?,
        }),
        opcode::LPOP => Ok(Request::LPop {
            key: r.len_prefixed("key")?,
        }),
        opcode::RPOP => Ok(Request::RPop {
            key: r.len_prefixed("key")?,
        }),

        opcode::EXPIRE => {
            let key = r.len_prefixed("key")?;
            let ttl = r.u32("ttl")?;
            Ok(Request::Expire { key, ttl })
        }

        opcode::LPUSH => {
            let key = r.len_prefixed("key")?;
            let value = r.len_prefixed("value")?;
            Ok(Request::LPush { key, value })
        }
        opcode::RPUSH => {
            let key = r.len_prefixed("key")?;
            let value = r.len_prefixed("value")?;
            Ok(Request::RPush { key, value })
        }
        opcode::SADD => {
            let key = r.len_prefixed("key")?;
            let member = r.len_prefixed("member")?;
            Ok(Request::SAdd { key, member })
        }
        opcode::SREM => {
            let key = r.len_prefixed("key")?;
            let member = r.len_prefixed("member")?;
            Ok(Request::SRem { key, member })
        }
        opcode::SISMEMBER => {
            let key = r.len_prefixed("key")?;
            let member = r.len_prefixed("member")?;
            Ok(Request::SIsMember { key, member })
        }
        opcode::GETSET => {
            let key = r.len_prefixed("key")?;
            let value = r.len_prefixed("value")?;
            Ok(Request::GetSet { key, value })
        }

        opcode::LINDEX => {
            let key = r.len_prefixed("key")?;
            let index = r.u32("index")?;
            Ok(Request::LIndex { key, index })
        }
        opcode::LRANGE => {
            let key = r.len_prefixed("key")?;
            let start = r.u32("start")?;
            let end = r.u32("end")?;
            Ok(Request::LRange { key, start, end })
        }

        opcode::HSET => {
            let key = r.len_prefixed("key")?;
            let field = r.len_prefixed("field")?;
            let value = r.len_prefixed("value")?;
            Ok(Request::HSet { key, field, value })
        }
        opcode::HGET => {
            let key = r.len_prefixed("key")?;
            let field = r.len_prefixed("field")?;
            Ok(Request::HGet { key, field })
        }
        opcode::HDEL => {
            let key = r.len_prefixed("key")?;
            let field = r.len_prefixed("field")?;
            Ok(Request::HDel { key, field })
        }
        opcode::HEXISTS => {
            let key = r.len_prefixed("key")?;
            let field = r.len_prefixed("field")?;
            Ok(Request::HExists { key, field })
        }

        opcode::KEYS => Ok(Request::Keys {
            pattern: r.len_prefixed("pattern")?,
        }),
        opcode::SCAN => {
            let cursor = r.u32("cursor")?;
            let pattern = r.len_prefixed("pattern")?;
            Ok(Request::Scan { cursor, pattern })
        }

        opcode::MGET if allow_batch => {
            let count = r.u32("count")? as usize;
            let mut keys = Vec::with_capacity(count.min(PREALLOC_CAP));
            for _ in 0..count {
                keys.push(r.len_prefixed("key")?);
            }
            Ok(Request::MGet { keys })
        }

        opcode::MSET if allow_batch => {
            let count = r.u32("count")? as usize;
            let mut entries = Vec::with_capacity(count.min(PREALLOC_CAP));
            for _ in 0..count {
                let key = r.len_prefixed("key")?;
                let value = r.len_prefixed("value")?;
                let ttl = r.u32("ttl")?;
                entries.push(SetEntry { key, value, ttl });
            }
            Ok(Request::MSet { entries })
        }

        opcode::PIPELINE if allow_batch => decode_pipeline(&mut r),

        opcode::MGET | opcode::MSET | opcode::PIPELINE => {
            Err(ProtocolError::NestedBatch(command))
        }

        other => Ok(Request::Unknown(other)),
    }
}

/// Decodes a pipeline payload: `count (msglen version command payload)*`.
///
/// A slot that fails to decode is kept as its error, and decoding resumes at
/// the next offset the embedded length announces. When even the slot header
/// is unreadable the offset cannot advance, so every remaining slot reports
/// the same failure.
fn decode_pipeline(r: &mut Reader<'_>) -> Result<Request, ProtocolError> {
    let count = r.u32("pipeline count")? as usize;
    let mut commands = Vec::with_capacity(count.min(PREALLOC_CAP));

    for _ in 0..count {
        let msg_len = match r.u32("pipeline message length") {
            Ok(n) => n as usize,
            Err(e) => {
                commands.push(Err(e));
                continue;
            }
        };
        let message = match r.bytes(msg_len, "pipeline message") {
            Ok(m) => m,
            Err(e) => {
                commands.push(Err(e));
                continue;
            }
        };

        if message.len() < 2 {
            commands.push(Err(ProtocolError::Truncated("pipeline message header")));
            continue;
        }
        if message[0] != PROTOCOL_VERSION {
            commands.push(Err(ProtocolError::UnsupportedVersion(message[0])));
            continue;
        }

        let payload = message.slice(2..);
        commands.push(decode_request(message[1], &payload, false));
    }

    Ok(Request::Pipeline { commands })
}

/// Checked cursor over a payload slice. Every read names the field it is
/// after so truncation errors stay diagnosable.
struct Reader<'a> {
    buf: &'a Bytes,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a Bytes) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, ProtocolError> {
        if self.remaining() < 4 {
            return Err(ProtocolError::Truncated(what));
        }
        let b = &self.buf[self.pos..self.pos + 4];
        self.pos += 4;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn bytes(&mut self, len: usize, what: &'static str) -> Result<Bytes, ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::Truncated(what));
        }
        let out = self.buf.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(out)
    }

    /// Reads a `[len: u32][len bytes]` field.
    fn len_prefixed(&mut self, what: &'static str) -> Result<Bytes, ProtocolError> {
        let len = self.u32(what)? as usize;
        self.bytes(len, what)
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;

    fn frame(version: u8, command: u8, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(2 + payload.len() as u32);
        buf.put_u8(version);
        buf.put_u8(command);
        buf.put_slice(payload);
        buf.freeze()
    }

    fn len_prefixed(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
        out
    }

    fn must_decode(command: u8, payload: &[u8]) -> Request {
        Request::decode(command, &Bytes::copy_from_slice(payload)).expect("decode should succeed")
    }

    #[test]
    fn incomplete_returns_none() {
        assert_eq!(parse_frame(&Bytes::new()).unwrap(), None);
        assert_eq!(parse_frame(&Bytes::from_static(b"\x00\x00")).unwrap(), None);
        // header announces 7 bytes, only 3 present
        assert_eq!(
            parse_frame(&Bytes::from_static(b"\x00\x00\x00\x07\x01\x02\x00")).unwrap(),
            None
        );
    }

    #[test]
    fn wrong_version_is_a_framing_error() {
        let wire = frame(0x02, opcode::GET, &len_prefixed(b"k"));
        let err = parse_frame(&wire).unwrap_err();
        assert_eq!(err, ProtocolError::UnsupportedVersion(2));
        assert!(err.is_framing());
    }

    #[test]
    fn undersized_length_rejected() {
        let wire = Bytes::from_static(b"\x00\x00\x00\x01\x01");
        assert_eq!(
            parse_frame(&wire).unwrap_err(),
            ProtocolError::FrameTooShort(1)
        );
    }

    #[test]
    fn oversized_length_rejected() {
        let wire = Bytes::from_static(b"\xff\xff\xff\xff\x01\x02");
        assert_eq!(
            parse_frame(&wire).unwrap_err(),
            ProtocolError::FrameTooLarge(u32::MAX)
        );
    }

    #[test]
    fn consumes_exactly_one_frame() {
        let mut wire = BytesMut::new();
        wire.put_slice(&frame(PROTOCOL_VERSION, opcode::GET, &len_prefixed(b"foo")));
        wire.put_slice(b"trailing");
        let wire = wire.freeze();

        let (parsed, consumed) = parse_frame(&wire).unwrap().unwrap();
        assert_eq!(parsed.command, opcode::GET);
        assert_eq!(consumed, wire.len() - b"trailing".len());
    }

    #[test]
    fn decode_set() {
        let mut payload = len_prefixed(b"foo");
        payload.extend_from_slice(&5u32.to_be_bytes()); // ttl
        payload.extend_from_slice(&len_prefixed(b"bar"));

        assert_eq!(
            must_decode(opcode::SET, &payload),
            Request::Set {
                key: Bytes::from_static(b"foo"),
                ttl: 5,
                value: Bytes::from_static(b"bar"),
            }
        );
    }

    #[test]
    fn decode_key_only_commands() {
        let payload = len_prefixed(b"k");
        assert_eq!(
            must_decode(opcode::GET, &payload),
            Request::Get {
                key: Bytes::from_static(b"k")
            }
        );
        assert_eq!(
            must_decode(opcode::LPOP, &payload),
            Request::LPop {
                key: Bytes::from_static(b"k")
            }
        );
        assert_eq!(
            must_decode(opcode::INCR, &payload),
            Request::Incr {
                key: Bytes::from_static(b"k")
            }
        );
    }

    #[test]
    fn decode_lrange() {
        let mut payload = len_prefixed(b"list");
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&9u32.to_be_bytes());

        assert_eq!(
            must_decode(opcode::LRANGE, &payload),
            Request::LRange {
                key: Bytes::from_static(b"list"),
                start: 0,
                end: 9,
            }
        );
    }

    #[test]
    fn decode_hset() {
        let mut payload = len_prefixed(b"h");
        payload.extend_from_slice(&len_prefixed(b"field"));
        payload.extend_from_slice(&len_prefixed(b"value"));

        assert_eq!(
            must_decode(opcode::HSET, &payload),
            Request::HSet {
                key: Bytes::from_static(b"h"),
                field: Bytes::from_static(b"field"),
                value: Bytes::from_static(b"value"),
            }
        );
    }

    #[test]
    fn decode_scan() {
        let mut payload = 20u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&len_prefixed(b"user:*"));

        assert_eq!(
            must_decode(opcode::SCAN, &payload),
            Request::Scan {
                cursor: 20,
                pattern: Bytes::from_static(b"user:*"),
            }
        );
    }

    #[test]
    fn decode_mget() {
        let mut payload = 2u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&len_prefixed(b"a"));
        payload.extend_from_slice(&len_prefixed(b"b"));

        assert_eq!(
            must_decode(opcode::MGET, &payload),
            Request::MGet {
                keys: vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")],
            }
        );
    }

    #[test]
    fn decode_mset() {
        let mut payload = 1u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&len_prefixed(b"k"));
        payload.extend_from_slice(&len_prefixed(b"v"));
        payload.extend_from_slice(&60u32.to_be_bytes());

        assert_eq!(
            must_decode(opcode::MSET, &payload),
            Request::MSet {
                entries: vec![SetEntry {
                    key: Bytes::from_static(b"k"),
                    value: Bytes::from_static(b"v"),
                    ttl: 60,
                }],
            }
        );
    }

    #[test]
    fn key_length_past_payload_end() {
        // keylen says 10, only 3 bytes follow
        let mut payload = 10u32.to_be_bytes().to_vec();
        payload.extend_from_slice(b"abc");

        let err = Request::decode(opcode::GET, &Bytes::from(payload)).unwrap_err();
        assert_eq!(err, ProtocolError::Truncated("key"));
        assert!(!err.is_framing());
    }

    #[test]
    fn mset_truncated_mid_triple() {
        let mut payload = 2u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&len_prefixed(b"k1"));
        payload.extend_from_slice(&len_prefixed(b"v1"));
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&len_prefixed(b"k2"));
        // second value and ttl missing

        let err = Request::decode(opcode::MSET, &Bytes::from(payload)).unwrap_err();
        assert_eq!(err, ProtocolError::Truncated("value"));
    }

    fn inner_message(version: u8, command: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(2 + payload.len() as u32).to_be_bytes());
        out.push(version);
        out.push(command);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn pipeline_two_commands() {
        let mut set = len_prefixed(b"a");
        set.extend_from_slice(&0u32.to_be_bytes());
        set.extend_from_slice(&len_prefixed(b"1"));

        let mut payload = 2u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&inner_message(PROTOCOL_VERSION, opcode::SET, &set));
        payload.extend_from_slice(&inner_message(
            PROTOCOL_VERSION,
            opcode::GET,
            &len_prefixed(b"a"),
        ));

        let req = must_decode(opcode::PIPELINE, &payload);
        let Request::Pipeline { commands } = req else {
            panic!("expected pipeline, got {req:?}");
        };
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], Ok(Request::Set { .. })));
        assert!(matches!(commands[1], Ok(Request::Get { .. })));
    }

    #[test]
    fn pipeline_bad_slot_recovers_at_next_offset() {
        // middle slot's payload truncates its key, but the embedded length
        // still tells the decoder where the next slot starts
        let bad = 99u32.to_be_bytes().to_vec(); // keylen 99, no key bytes

        let mut payload = 3u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&inner_message(
            PROTOCOL_VERSION,
            opcode::GET,
            &len_prefixed(b"a"),
        ));
        payload.extend_from_slice(&inner_message(PROTOCOL_VERSION, opcode::GET, &bad));
        payload.extend_from_slice(&inner_message(
            PROTOCOL_VERSION,
            opcode::GET,
            &len_prefixed(b"c"),
        ));

        let Request::Pipeline { commands } = must_decode(opcode::PIPELINE, &payload) else {
            panic!("expected pipeline");
        };
        assert_eq!(commands.len(), 3);
        assert!(commands[0].is_ok());
        assert_eq!(commands[1], Err(ProtocolError::Truncated("key")));
        assert_eq!(
            commands[2],
            Ok(Request::Get {
                key: Bytes::from_static(b"c")
            })
        );
    }

    #[test]
    fn pipeline_rejects_nested_batches() {
        let nested = 0u32.to_be_bytes().to_vec(); // empty inner pipeline

        let mut payload = 1u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&inner_message(PROTOCOL_VERSION, opcode::PIPELINE, &nested));

        let Request::Pipeline { commands } = must_decode(opcode::PIPELINE, &payload) else {
            panic!("expected pipeline");
        };
        assert_eq!(commands[0], Err(ProtocolError::NestedBatch(opcode::PIPELINE)));
    }

    #[test]
    fn pipeline_bad_inner_version() {
        let mut payload = 1u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&inner_message(0x07, opcode::GET, &len_prefixed(b"a")));

        let Request::Pipeline { commands } = must_decode(opcode::PIPELINE, &payload) else {
            panic!("expected pipeline");
        };
        assert_eq!(commands[0], Err(ProtocolError::UnsupportedVersion(7)));
    }

    #[test]
    fn pipeline_truncated_header_errors_remaining_slots() {
        // announces 2 slots but carries no messages at all
        let payload = 2u32.to_be_bytes().to_vec();

        let Request::Pipeline { commands } = must_decode(opcode::PIPELINE, &payload) else {
            panic!("expected pipeline");
        };
        assert_eq!(commands.len(), 2);
        assert!(commands.iter().all(|c| c.is_err()));
    }

    #[test]
    fn unknown_opcode_decodes_to_unknown() {
        assert_eq!(must_decode(0x7f, b""), Request::Unknown(0x7f));
    }

    #[test]
    fn binary_keys_survive_decoding() {
        let key = b"\x00\xffbin\x01";
        let payload = len_prefixed(key);
        assert_eq!(
            must_decode(opcode::GET, &payload),
            Request::Get {
                key: Bytes::copy_from_slice(key)
            }
        );
    }
}
