//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing or decoding the wire protocol.
///
/// Framing errors ([`is_framing`](ProtocolError::is_framing) returns `true`)
/// mean the byte stream can no longer be trusted and the connection should be
/// closed. Payload errors describe a single malformed message inside a
/// well-framed stream; the server answers them with an `ERROR` response and
/// keeps the connection open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer doesn't contain a complete frame yet. The caller should
    /// read more data and try again.
    #[error("incomplete frame: need more data")]
    Incomplete,

    /// The version byte didn't match the protocol version this server speaks.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The declared frame length can't even cover the version and command
    /// bytes.
    #[error("frame length {0} below header minimum")]
    FrameTooShort(u32),

    /// The declared frame length exceeds the hard cap. Refusing early keeps a
    /// single client from pinning an arbitrarily large receive buffer.
    #[error("frame length {0} exceeds maximum")]
    FrameTooLarge(u32),

    /// A declared length inside the payload runs past the payload end.
    #[error("truncated payload: {0}")]
    Truncated(&'static str),

    /// MGET, MSET, and PIPELINE may not appear inside a pipeline.
    #[error("nested batch command {0:#04x} not allowed in pipeline")]
    NestedBatch(u8),
}

impl ProtocolError {
    /// Returns `true` if this error invalidates the whole stream rather than
    /// a single message.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            ProtocolError::Incomplete
                | ProtocolError::UnsupportedVersion(_)
                | ProtocolError::FrameTooShort(_)
                | ProtocolError::FrameTooLarge(_)
        )
    }
}
