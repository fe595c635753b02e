//! # Error Types
//!
//! Error handling for the connection handshake.
//!
//! This module defines every error variant the handshake can produce, from
//! socket failures to malformed connectionless replies.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and file system failures
//! - **Decode Errors**: truncated or malformed packet fields
//! - **Encode Errors**: outbound packets that do not fit their scratch buffer
//! - **Identity Errors**: the ticket provider could not produce a ticket
//! - **Transport Errors**: the client handle outlived its transport
//!
//! Decode errors are recoverable: the offending packet is dropped and the
//! handshake keeps waiting. Everything that stops the attempt from making
//! progress reports `true` from [`ProtocolError::is_fatal`]. That includes
//! encode overflows, since an outbound packet that does not fit once will
//! not fit on the next reply either.
//!
//! ## Example Usage
//! ```rust
//! use source_connector::core::bitbuf::BitReader;
//! use source_connector::error::{ProtocolError, Result};
//!
//! fn read_header(data: &[u8]) -> Result<i32> {
//!     BitReader::new(data).read_i32()
//! }
//!
//! match read_header(&[0xFF, 0xFF]) {
//!     Err(ProtocolError::Decode(_)) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Decode errors
    pub const ERR_UNEXPECTED_END: &str = "Unexpected end of packet";
    pub const ERR_INVALID_BIT_COUNT: &str = "Bit count must be between 1 and 32";
    pub const ERR_MISSING_HEADER: &str = "Missing connectionless header";
    pub const ERR_MISSING_TYPE: &str = "Missing connectionless packet type";

    /// Identity errors
    pub const ERR_EMPTY_TICKET: &str = "Identity provider returned an empty ticket";
    pub const ERR_TICKET_TOO_LARGE: &str = "Authentication ticket does not fit in a connect packet";

    /// Transport errors
    pub const ERR_OVERSIZED_DATAGRAM: &str = "Datagram exceeds maximum size";
    pub const ERR_NO_ADDRESS: &str = "Server address did not resolve";
}

/// ProtocolError is the primary error type for all handshake operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Bit buffer overflow (capacity {capacity} bytes)")]
    BufferOverflow { capacity: usize },

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Connector is not registered with a client")]
    NotRegistered,

    #[error("Client channel closed")]
    ChannelClosed,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Whether this error ends the connection attempt.
    ///
    /// Malformed packets are survivable; the handshake simply waits for the
    /// next reply. Missing credentials, oversized outbound packets or a dead
    /// transport are not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::BufferOverflow { .. }
                | ProtocolError::Identity(_)
                | ProtocolError::NotRegistered
                | ProtocolError::ChannelClosed
                | ProtocolError::TransportError(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_recoverable() {
        assert!(!ProtocolError::Decode(constants::ERR_UNEXPECTED_END.into()).is_fatal());
        assert!(!ProtocolError::Timeout.is_fatal());
    }

    #[test]
    fn credential_and_transport_errors_are_fatal() {
        assert!(ProtocolError::Identity(constants::ERR_EMPTY_TICKET.into()).is_fatal());
        assert!(ProtocolError::NotRegistered.is_fatal());
        assert!(ProtocolError::ChannelClosed.is_fatal());
        assert!(ProtocolError::Io(io::Error::other("boom")).is_fatal());
    }

    #[test]
    fn encode_overflow_is_fatal() {
        assert!(ProtocolError::BufferOverflow { capacity: 2048 }.is_fatal());
    }
}
