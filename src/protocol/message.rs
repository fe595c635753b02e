//! Handshake messages and the factories that build them.
//!
//! A [`Message`] is either *connectionless* (prefixed with the `-1` marker,
//! used during the handshake) or *connected* (a net channel payload whose
//! leading 6-bit field names the message type).

use crate::config::{
    AUTH_PROTOCOL_TICKET, CONNECTIONLESS_HEADER, NET_MESSAGE_BITS, PROTOCOL_VERSION,
    SCRATCH_BUFFER_SIZE,
};
use crate::core::bitbuf::{BitReader, BitWriter};
use crate::error::{constants, ProtocolError, Result};
use bytes::Bytes;

/// One-byte type codes carried after the connectionless marker
pub mod packet_type {
    /// Client challenge query
    pub const C2S_QUERY: u8 = b'q';
    /// Client authenticated connect
    pub const C2S_CONNECT: u8 = b'k';
    /// Server challenge acknowledgement
    pub const S2C_CHALLENGE: u8 = b'A';
    /// Server accepted the credentials
    pub const S2C_CONNECTION: u8 = b'B';
    /// Server refused the connection
    pub const S2C_CONNREJECT: u8 = b'9';
}

/// Net message types carried in the leading 6-bit field of connected payloads
pub mod net_message {
    pub const NET_DISCONNECT: u32 = 1;
    pub const NET_STRING_CMD: u32 = 4;
    pub const NET_SIGNON_STATE: u32 = 6;
}

/// How a message travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Connectionless,
    Connected { sub_type: u8 },
}

/// A single datagram payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    data: Bytes,
}

/// Fields of the authenticated connect (`'k'`) packet
#[derive(Debug, Clone, Copy)]
pub struct ConnectRequest<'a> {
    pub client_challenge: i32,
    pub server_challenge: i32,
    pub player_name: &'a str,
    pub password: &'a str,
    pub game_version: &'a str,
    pub identity_id: u64,
    pub ticket: &'a [u8],
}

impl Message {
    /// Tag a raw datagram by inspecting its first bytes
    pub fn classify(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let mut reader = BitReader::new(&data);

        let kind = match reader.read_i32() {
            Ok(CONNECTIONLESS_HEADER) => MessageKind::Connectionless,
            _ => {
                let sub_type = BitReader::new(&data)
                    .read_bits(NET_MESSAGE_BITS)
                    .map(|t| t as u8)
                    .unwrap_or(0);
                MessageKind::Connected { sub_type }
            }
        };

        Self { kind, data }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn connectionless(&self) -> bool {
        self.kind == MessageKind::Connectionless
    }

    /// Net message type of a connected payload; 0 for connectionless ones
    pub fn sub_type(&self) -> u8 {
        match self.kind {
            MessageKind::Connected { sub_type } => sub_type,
            MessageKind::Connectionless => 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Challenge query that opens the handshake.
    pub fn connectionless_query(client_challenge: i32) -> Self {
        let mut data = Vec::with_capacity(9);
        data.extend_from_slice(&CONNECTIONLESS_HEADER.to_le_bytes());
        data.push(packet_type::C2S_QUERY);
        data.extend_from_slice(&client_challenge.to_le_bytes());

        Self {
            kind: MessageKind::Connectionless,
            data: Bytes::from(data),
        }
    }

    /// Authenticated connect packet answering a challenge.
    ///
    /// The trailing block is prefixed with its length and holds the 64-bit
    /// identity followed by the ticket.
    ///
    /// # Errors
    /// `Identity` when the ticket cannot be length-prefixed,
    /// `BufferOverflow` when the strings do not fit in the scratch buffer.
    pub fn connectionless_connect(req: &ConnectRequest<'_>) -> Result<Self> {
        let block_len = u16::try_from(8 + req.ticket.len())
            .map_err(|_| ProtocolError::Identity(constants::ERR_TICKET_TOO_LARGE.into()))?;

        let mut w = BitWriter::with_capacity(SCRATCH_BUFFER_SIZE);
        w.write_i32(CONNECTIONLESS_HEADER)?;
        w.write_u8(packet_type::C2S_CONNECT)?;
        w.write_i32(PROTOCOL_VERSION)?;
        w.write_i32(AUTH_PROTOCOL_TICKET)?;
        w.write_i32(req.server_challenge)?;
        w.write_i32(req.client_challenge)?;
        w.write_cstring(req.player_name.as_bytes())?;
        w.write_cstring(req.password.as_bytes())?;
        w.write_cstring(req.game_version.as_bytes())?;
        w.write_u16(block_len)?;
        w.write_u64(req.identity_id)?;
        w.write_bytes(req.ticket)?;

        Ok(Self {
            kind: MessageKind::Connectionless,
            data: Bytes::from(w.into_bytes()),
        })
    }

    /// Net disconnect carrying a human readable reason
    pub fn disconnect(reason: &str) -> Result<Self> {
        let mut w = BitWriter::with_capacity(SCRATCH_BUFFER_SIZE);
        w.write_bits(net_message::NET_DISCONNECT, NET_MESSAGE_BITS)?;
        w.write_cstring(reason.as_bytes())?;

        Ok(Self {
            kind: MessageKind::Connected {
                sub_type: net_message::NET_DISCONNECT as u8,
            },
            data: Bytes::from(w.into_bytes()),
        })
    }

    /// Wrap already-encoded bytes for sending
    pub fn generic(data: impl Into<Bytes>) -> Self {
        Self::classify(data)
    }
}
