//! Response encoding.
//!
//! Every response is `[status: u8][datalen: u32][data]`. Scalar answers
//! (lengths, counters, 0/1 booleans) are rendered as ASCII decimal bytes;
//! composite answers use the body encoders below. Serialization writes
//! directly into a caller-provided `BytesMut` with no intermediate
//! allocations.

use bytes::{BufMut, Bytes, BytesMut};

/// Length sentinel marking a missing value in an MGET body.
pub const NIL_LEN: u32 = 0xFFFF_FFFF;

/// Response status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Error = 0x01,
    NotFound = 0x02,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Status> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::Error),
            0x02 => Some(Status::NotFound),
            _ => None,
        }
    }
}

/// A single wire response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub data: Bytes,
}

impl Response {
    /// `OK` with no data.
    pub fn ok() -> Response {
        Response {
            status: Status::Ok,
            data: Bytes::new(),
        }
    }

    /// `OK` carrying raw data.
    pub fn with_data(data: impl Into<Bytes>) -> Response {
        Response {
            status: Status::Ok,
            data: data.into(),
        }
    }

    /// `OK` carrying an integer rendered as ASCII decimal.
    pub fn integer(value: i64) -> Response {
        let mut buf = itoa::Buffer::new();
        Response::with_data(Bytes::copy_from_slice(buf.format(value).as_bytes()))
    }

    /// `NOT_FOUND` with no data.
    pub fn not_found() -> Response {
        Response {
            status: Status::NotFound,
            data: Bytes::new(),
        }
    }

    /// `ERROR` carrying a human-readable message.
    pub fn error(message: impl Into<String>) -> Response {
        Response {
            status: Status::Error,
            data: Bytes::from(message.into().into_bytes()),
        }
    }

    /// Number of bytes [`encode`](Response::encode) will write.
    pub fn encoded_len(&self) -> usize {
        5 + self.data.len()
    }

    /// Writes the wire representation into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(self.status as u8);
        dst.put_u32(self.data.len() as u32);
        dst.put_slice(&self.data);
    }

    /// Reads one response back out of a byte slice, returning the response
    /// and the bytes consumed. `None` means more data is needed.
    ///
    /// The server never calls this; it exists for clients and for tests that
    /// check composite bodies slot by slot.
    pub fn parse(buf: &[u8]) -> Option<(Response, usize)> {
        if buf.len() < 5 {
            return None;
        }
        let status = Status::from_u8(buf[0])?;
        let datalen = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        if buf.len() < 5 + datalen {
            return None;
        }
        let data = Bytes::copy_from_slice(&buf[5..5 + datalen]);
        Some((Response { status, data }, 5 + datalen))
    }
}

/// Encodes `count (itemlen item)*`, the body for LRANGE, SMEMBERS, KEYS.
pub fn encode_array(items: &[Bytes]) -> Bytes {
    let total = 4 + items.iter().map(|i| 4 + i.len()).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(items.len() as u32);
    for item in items {
        buf.put_u32(item.len() as u32);
        buf.put_slice(item);
    }
    buf.freeze()
}

/// Encodes `count (fieldlen field valuelen value)*`, the HGETALL body.
/// Field order is whatever the snapshot yielded; the protocol leaves it
/// unspecified.
pub fn encode_entries(entries: &[(Bytes, Bytes)]) -> Bytes {
    let total = 4 + entries
        .iter()
        .map(|(f, v)| 8 + f.len() + v.len())
        .sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(entries.len() as u32);
    for (field, value) in entries {
        buf.put_u32(field.len() as u32);
        buf.put_slice(field);
        buf.put_u32(value.len() as u32);
        buf.put_slice(value);
    }
    buf.freeze()
}

/// Encodes `count (valuelen value)*` with [`NIL_LEN`] marking missing slots,
/// the MGET body.
pub fn encode_mget(values: &[Option<Bytes>]) -> Bytes {
    let total = 4 + values
        .iter()
        .map(|v| 4 + v.as_ref().map_or(0, |b| b.len()))
        .sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(values.len() as u32);
    for value in values {
        match value {
            Some(v) => {
                buf.put_u32(v.len() as u32);
                buf.put_slice(v);
            }
            None => buf.put_u32(NIL_LEN),
        }
    }
    buf.freeze()
}

/// Encodes `cursor count (keylen key)*`, the SCAN body. A cursor of 0 means
/// the iteration is complete.
pub fn encode_scan(cursor: u32, keys: &[Bytes]) -> Bytes {
    let total = 8 + keys.iter().map(|k| 4 + k.len()).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(cursor);
    buf.put_u32(keys.len() as u32);
    for key in keys {
        buf.put_u32(key.len() as u32);
        buf.put_slice(key);
    }
    buf.freeze()
}

/// Encodes `count response*`, the PIPELINE body. Each inner response is
/// embedded verbatim, preserving order.
pub fn encode_pipeline(responses: &[Response]) -> Bytes {
    let total = 4 + responses.iter().map(Response::encoded_len).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(responses.len() as u32);
    for response in responses {
        response.encode(&mut buf);
    }
    buf.freeze()
}
