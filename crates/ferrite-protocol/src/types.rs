//! Typed representation of client commands.
//!
//! The payload of each frame is decoded into a [`Request`] variant at the
//! protocol boundary, so the execution layer dispatches on an exhaustive sum
//! type instead of re-inspecting raw bytes. Keys, members, fields, values,
//! and patterns are all binary-safe `Bytes`; comparisons downstream are
//! byte-exact.

use bytes::Bytes;

use crate::error::ProtocolError;

/// Command opcodes as they appear on the wire.
pub mod opcode {
    pub const SET: u8 = 0x01;
    pub const GET: u8 = 0x02;
    pub const DEL: u8 = 0x03;
    pub const EXISTS: u8 = 0x04;
    pub const EXPIRE: u8 = 0x05;
    pub const TTL: u8 = 0x06;
    pub const MGET: u8 = 0x07;
    pub const MSET: u8 = 0x08;
    pub const PIPELINE: u8 = 0x09;

    pub const LPUSH: u8 = 0x10;
    pub const RPUSH: u8 = 0x11;
    pub const LPOP: u8 = 0x12;
    pub const RPOP: u8 = 0x13;
    pub const LLEN: u8 = 0x14;
    pub const LINDEX: u8 = 0x15;
    pub const LRANGE: u8 = 0x16;

    pub const SADD: u8 = 0x20;
    pub const SREM: u8 = 0x21;
    pub const SMEMBERS: u8 = 0x22;
    pub const SCARD: u8 = 0x23;
    pub const SISMEMBER: u8 = 0x24;

    pub const HSET: u8 = 0x30;
    pub const HGET: u8 = 0x31;
    pub const HDEL: u8 = 0x32;
    pub const HGETALL: u8 = 0x33;
    pub const HLEN: u8 = 0x34;
    pub const HEXISTS: u8 = 0x35;

    pub const INCR: u8 = 0x40;
    pub const DECR: u8 = 0x41;
    pub const GETSET: u8 = 0x42;
    pub const KEYS: u8 = 0x43;
    pub const SCAN: u8 = 0x44;
}

/// One key/value/ttl triple inside an MSET payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEntry {
    pub key: Bytes,
    pub value: Bytes,
    /// TTL in seconds; 0 means no expiration.
    pub ttl: u32,
}

/// A decoded client command, ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// SET <key> <value> with an optional TTL (0 = none).
    Set { key: Bytes, ttl: u32, value: Bytes },

    /// GET <key>. Returns the string value or NOT_FOUND.
    Get { key: Bytes },

    /// DEL <key>. Answers "1" if the key was removed, "0" otherwise.
    Del { key: Bytes },

    /// EXISTS <key>. Answers "1" or "0".
    Exists { key: Bytes },

    /// EXPIRE <key> <ttl>. TTL 0 clears the deadline.
    Expire { key: Bytes, ttl: u32 },

    /// TTL <key>. Answers remaining seconds, "-1" (no expiry) or "-2"
    /// (missing).
    Ttl { key: Bytes },

    /// MGET: batched GET over several keys, missing values encoded with the
    /// nil sentinel.
    MGet { keys: Vec<Bytes> },

    /// MSET: batched SET of key/value/ttl triples.
    MSet { entries: Vec<SetEntry> },

    /// PIPELINE: embedded frames executed in order. Slots that failed to
    /// decode carry their error so the executor can answer them in position.
    Pipeline {
        commands: Vec<Result<Request, ProtocolError>>,
    },

    /// LPUSH <key> <value>. Answers the new list length.
    LPush { key: Bytes, value: Bytes },

    /// RPUSH <key> <value>. Answers the new list length.
    RPush { key: Bytes, value: Bytes },

    /// LPOP <key>.
    LPop { key: Bytes },

    /// RPOP <key>.
    RPop { key: Bytes },

    /// LLEN <key>.
    LLen { key: Bytes },

    /// LINDEX <key> <index>. No negative indexing; out of range is
    /// NOT_FOUND.
    LIndex { key: Bytes, index: u32 },

    /// LRANGE <key> <start> <end>, endpoints inclusive after clamping.
    LRange { key: Bytes, start: u32, end: u32 },

    /// SADD <key> <member>. Answers "1" when newly inserted.
    SAdd { key: Bytes, member: Bytes },

    /// SREM <key> <member>. Answers "1" when the member was present.
    SRem { key: Bytes, member: Bytes },

    /// SMEMBERS <key>. Unordered snapshot.
    SMembers { key: Bytes },

    /// SCARD <key>.
    SCard { key: Bytes },

    /// SISMEMBER <key> <member>. Answers "1" or "0".
    SIsMember { key: Bytes, member: Bytes },

    /// HSET <key> <field> <value>. Answers "1" when the field is new.
    HSet {
        key: Bytes,
        field: Bytes,
        value: Bytes,
    },

    /// HGET <key> <field>.
    HGet { key: Bytes, field: Bytes },

    /// HDEL <key> <field>. Answers "1" when the field was present.
    HDel { key: Bytes, field: Bytes },

    /// HGETALL <key>. Field order is unspecified.
    HGetAll { key: Bytes },

    /// HLEN <key>.
    HLen { key: Bytes },

    /// HEXISTS <key> <field>. Answers "1" or "0".
    HExists { key: Bytes, field: Bytes },

    /// INCR <key>. A missing key counts from 0.
    Incr { key: Bytes },

    /// DECR <key>. A missing key counts from 0.
    Decr { key: Bytes },

    /// GETSET <key> <value>. Answers the old value, storing the new one
    /// either way.
    GetSet { key: Bytes, value: Bytes },

    /// KEYS <pattern>. Glob match over the whole keyspace.
    Keys { pattern: Bytes },

    /// SCAN <cursor> <pattern>. Positional cursor over a sorted snapshot.
    Scan { cursor: u32, pattern: Bytes },

    /// An opcode this server doesn't recognize. Kept so the executor can
    /// answer with an error instead of dropping the connection.
    Unknown(u8),
}
