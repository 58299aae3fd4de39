//! Error types for keyspace operations.

use thiserror::Error;

/// The operation was attempted on a key holding a value of the wrong type,
/// e.g. a list command against a string key.
///
/// The display string is the stable wire message; clients match on the
/// `WRONGTYPE` prefix.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
pub struct WrongType;

/// Errors returned by INCR/DECR.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IncrError {
    #[error(transparent)]
    WrongType(#[from] WrongType),

    /// The stored value is not a signed 64-bit decimal, or the operation
    /// would overflow one.
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_type_message_has_stable_prefix() {
        assert!(WrongType.to_string().starts_with("WRONGTYPE"));
    }

    #[test]
    fn incr_error_messages() {
        assert!(IncrError::WrongType(WrongType)
            .to_string()
            .starts_with("WRONGTYPE"));
        assert_eq!(
            IncrError::NotAnInteger.to_string(),
            "ERR value is not an integer or out of range"
        );
    }
}
