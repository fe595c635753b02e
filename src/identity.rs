//! Identity ticket providers.
//!
//! The connector needs two things from the account's identity service: the
//! 64-bit identity and a freshly issued authentication ticket. Both are
//! opaque to the handshake.

use crate::error::{constants, ProtocolError, Result};
use std::sync::Arc;

/// Source of the identity presented in the connect packet
pub trait IdentityProvider: Send {
    /// 64-bit account identity
    fn identity_id(&self) -> u64;

    /// Issue a new authentication ticket.
    ///
    /// # Errors
    /// `ProtocolError::Identity` when no ticket can be issued. The handshake
    /// cannot continue without one.
    fn create_ticket(&self) -> Result<Vec<u8>>;
}

impl<T: IdentityProvider + Sync> IdentityProvider for Arc<T> {
    fn identity_id(&self) -> u64 {
        (**self).identity_id()
    }

    fn create_ticket(&self) -> Result<Vec<u8>> {
        (**self).create_ticket()
    }
}

/// Provider handing out a ticket obtained ahead of time
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    identity_id: u64,
    ticket: Vec<u8>,
}

impl StaticIdentity {
    pub fn new(identity_id: u64, ticket: Vec<u8>) -> Self {
        Self {
            identity_id,
            ticket,
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity_id(&self) -> u64 {
        self.identity_id
    }

    fn create_ticket(&self) -> Result<Vec<u8>> {
        if self.ticket.is_empty() {
            return Err(ProtocolError::Identity(constants::ERR_EMPTY_TICKET.into()));
        }
        Ok(self.ticket.clone())
    }
}
